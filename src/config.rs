//! Configuration constants for the ytdlp-interactive front-end
//!
//! This module contains application-wide values: tool names, flag names the
//! downloader understands, default selectors, and well-known endpoints.

/// The current application version (keep in sync with Cargo.toml)
pub const APP_VERSION: &str = "1.0.0";

/// Name used for config, data and cache folders
pub const APP_NAME: &str = "ytdlp-interactive";

/// Banner text shown at startup
pub const APP_TITLE: &str = "YTDLP-Interactive";

/// Environment variable that relocates settings and downloads-data
pub const HOME_OVERRIDE_ENV: &str = "YTDLP_INTERACTIVE_HOME";

/// Settings file name inside the application folder
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Folder holding the per-video metadata cache
pub const DOWNLOADS_DATA_FOLDER_NAME: &str = "downloads-data";

/// External downloader binary
pub const DOWNLOADER_BIN: &str = "yt-dlp";

/// External muxer binary
pub const MUXER_BIN: &str = "ffmpeg";

/// Format selector used until the user pins another one
pub const DEFAULT_FORMAT_SELECTOR: &str = "bv+ba";

/// Suffix pairing a video-only stream with the best audio stream
pub const BEST_AUDIO_SUFFIX: &str = "+ba";

// Downloader flags
pub const FLAG_MUXER_LOCATION: &str = "--ffmpeg-location";
pub const FLAG_FORMAT: &str = "-f";
pub const FLAG_OUTPUT: &str = "-o";
pub const FLAG_DOWNLOAD_SECTIONS: &str = "--download-sections";
pub const FLAG_FORCE_KEYFRAMES: &str = "--force-keyframes-at-cuts";
pub const FLAG_LOAD_INFO_JSON: &str = "--load-info-json";
pub const FLAG_SKIP_DOWNLOAD: &str = "--skip-download";
pub const FLAG_WRITE_INFO_JSON: &str = "--write-info-json";

// Output template placeholders resolved by the downloader
pub const PLACEHOLDER_TITLE: &str = "%(title)s";
pub const PLACEHOLDER_CHANNEL: &str = "%(channel)s";
pub const PLACEHOLDER_EXT: &str = "%(ext)s";

/// Characters replaced with `_` in derived file names
pub static FILENAME_FORBIDDEN_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Maximum length of a sanitized file name stem
pub const SANITIZED_FILENAME_MAX_LEN: usize = 50;

/// Total download attempts per cycle, including the first one
pub const MAX_DOWNLOAD_ATTEMPTS: usize = 3;

/// Latest downloader release, as published on GitHub
pub static LATEST_RELEASE_API_URL: &str = "https://api.github.com/repos/yt-dlp/yt-dlp/releases/latest";

/// Where users are sent to update the downloader
pub static RELEASES_PAGE_URL: &str = "https://github.com/yt-dlp/yt-dlp/releases";

/// Public IP lookup endpoint
pub static PUBLIC_IP_URL: &str = "https://api.ipify.org?format=json";

/// Host resolved to decide whether the machine is online
pub static CONNECTIVITY_PROBE_HOST: &str = "google.com:443";

/// Spinner tick interval in milliseconds
pub const SPINNER_TICK_MS: u64 = 80;
