//! Persistent settings and history document
//!
//! This module handles locating, creating, loading and saving the single
//! JSON document that carries tool paths, defaults and all history lists
//! between sessions.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Timelike};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::arguments::Format;
use crate::config::{APP_NAME, DOWNLOADS_DATA_FOLDER_NAME, HOME_OVERRIDE_ENV, SETTINGS_FILE_NAME};
use crate::error::{AppError, AppResult};
use crate::history::{upsert_most_recent, upsert_string, DownloadRecord, UrlHistoryEntry};

/// Everything remembered between sessions
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SettingsDocument {
    #[serde(alias = "ytdlp_path")]
    pub downloader_path: String,
    #[serde(alias = "ffmpeg_path")]
    pub muxer_path: String,
    #[serde(alias = "ytdlp_version")]
    pub downloader_version: String,
    #[serde(alias = "ytdlp_version_latest")]
    pub downloader_version_latest: String,
    #[serde(alias = "ffmpeg_version")]
    pub muxer_version: String,
    pub platform: String,
    pub app_folder: String,
    pub downloads_data_folder: String,
    pub user_downloads_location: String,
    pub default_download_location: String,
    pub default_format: Format,
    pub url_history: Vec<UrlHistoryEntry>,
    pub download_location_history: Vec<String>,
    pub extra_commands_history: Vec<String>,
    pub downloads_history: Vec<DownloadRecord>,
    /// RFC 3339 time of the last latest-version lookup, empty if never
    #[serde(alias = "last_fetched_ytdlp_version_at")]
    pub last_fetched_latest_at: String,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            downloader_path: String::new(),
            muxer_path: String::new(),
            downloader_version: String::new(),
            downloader_version_latest: String::new(),
            muxer_version: String::new(),
            platform: std::env::consts::OS.to_string(),
            app_folder: String::new(),
            downloads_data_folder: String::new(),
            user_downloads_location: String::new(),
            default_download_location: String::new(),
            default_format: Format::default(),
            url_history: Vec::new(),
            download_location_history: Vec::new(),
            extra_commands_history: Vec::new(),
            downloads_history: Vec::new(),
            last_fetched_latest_at: String::new(),
        }
    }
}

/// Versions and locations of the external tools found on the host
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ToolInventory {
    pub downloader_path: String,
    pub downloader_version: String,
    pub muxer_path: String,
    pub muxer_version: String,
}

impl SettingsDocument {
    /// Build the first-run document
    pub fn initial(tools: ToolInventory, paths: &AppPaths, user_downloads: &str) -> Self {
        Self {
            downloader_path: tools.downloader_path,
            muxer_path: tools.muxer_path,
            downloader_version: tools.downloader_version,
            muxer_version: tools.muxer_version,
            app_folder: paths.app_folder.to_string_lossy().to_string(),
            downloads_data_folder: paths.downloads_data_folder.to_string_lossy().to_string(),
            user_downloads_location: user_downloads.to_string(),
            default_download_location: user_downloads.to_string(),
            download_location_history: vec![user_downloads.to_string()],
            ..Self::default()
        }
    }

    pub fn record_url(&mut self, entry: UrlHistoryEntry) {
        upsert_most_recent(&mut self.url_history, entry, |e| e.url.clone());
    }

    pub fn record_download_location(&mut self, location: &str) {
        upsert_string(&mut self.download_location_history, location);
    }

    pub fn record_extra_commands(&mut self, extra_commands: &str) {
        upsert_string(&mut self.extra_commands_history, extra_commands);
    }

    pub fn record_download(&mut self, record: DownloadRecord) {
        upsert_most_recent(&mut self.downloads_history, record, |r| r.key().to_string());
    }

    pub fn set_default_format(&mut self, format: Format) {
        self.default_format = format;
    }

    pub fn set_default_download_location(&mut self, location: &str) {
        self.default_download_location = location.to_string();
    }

    /// Whether the cached latest downloader version should be looked up again.
    ///
    /// Compares the hour of day of `now` against the hour of day of the last
    /// lookup, not the elapsed duration. Only a later hour of day is stale,
    /// whatever the date: a lookup made during hour 23 is never considered
    /// stale again, and a lookup at 10:xx stays fresh on every later day
    /// until 11:00. A missing or unreadable timestamp is stale.
    pub fn latest_version_is_stale(&self, now: DateTime<Local>) -> bool {
        match DateTime::parse_from_rfc3339(&self.last_fetched_latest_at) {
            Ok(last) => {
                let last_hour = last.with_timezone(&Local).hour() as i64;
                now.hour() as i64 - last_hour >= 1
            }
            Err(_) => true,
        }
    }

    /// Remember a fresh latest-version lookup
    pub fn record_latest_version(&mut self, version: &str, now: DateTime<Local>) {
        self.downloader_version_latest = version.to_string();
        self.last_fetched_latest_at = now.to_rfc3339();
    }
}

/// Folders the application reads and writes
#[derive(Clone, Debug, PartialEq)]
pub struct AppPaths {
    pub app_folder: PathBuf,
    pub settings_path: PathBuf,
    pub downloads_data_folder: PathBuf,
}

impl AppPaths {
    /// Lay out settings and downloads-data beneath a single folder
    pub fn under(app_folder: &Path) -> Self {
        Self {
            app_folder: app_folder.to_path_buf(),
            settings_path: app_folder.join(SETTINGS_FILE_NAME),
            downloads_data_folder: app_folder.join(DOWNLOADS_DATA_FOLDER_NAME),
        }
    }

    /// Resolve the platform locations, honouring the home override variable
    pub fn resolve() -> std::io::Result<Self> {
        if let Ok(home) = std::env::var(HOME_OVERRIDE_ENV) {
            if !home.trim().is_empty() {
                return Ok(Self::under(Path::new(home.trim())));
            }
        }

        #[cfg(windows)]
        {
            let exe_path = std::env::current_exe()?;
            let exe_dir = exe_path.parent().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get executable directory")
            })?;
            Ok(Self {
                app_folder: exe_dir.to_path_buf(),
                settings_path: exe_dir.join("ytdlp_interactive_settings.json"),
                downloads_data_folder: exe_dir.join(DOWNLOADS_DATA_FOLDER_NAME),
            })
        }

        #[cfg(target_os = "macos")]
        {
            let home_dir = dirs::home_dir().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get home directory")
            })?;
            Ok(Self::under(&home_dir.join("Library/Application Support").join(APP_NAME)))
        }

        #[cfg(not(any(windows, target_os = "macos")))]
        {
            if let Ok(xdg_dirs) = xdg::BaseDirectories::new() {
                let config_dir = xdg_dirs.get_config_home().join(APP_NAME);
                Ok(Self {
                    settings_path: config_dir.join(SETTINGS_FILE_NAME),
                    app_folder: config_dir,
                    downloads_data_folder: xdg_dirs.get_data_home().join(APP_NAME).join(DOWNLOADS_DATA_FOLDER_NAME),
                })
            } else {
                let home_dir = dirs::home_dir().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get home directory")
                })?;
                Ok(Self::under(&home_dir.join(format!(".{}", APP_NAME))))
            }
        }
    }
}

/// The user's downloads folder, falling back to `~/Downloads`
pub fn user_downloads_folder() -> String {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "Downloads".to_string())
}

/// Reads and writes the settings document
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read and parse the document; malformed JSON is an error, never repaired
    pub fn load(&self) -> AppResult<SettingsDocument> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| AppError::file(&self.path, e))?;
        let doc = serde_json::from_str(&content).map_err(|e| AppError::parse(&self.path, e))?;
        debug!("Settings loaded from {}", self.path.display());
        Ok(doc)
    }

    /// Overwrite the file with the document, two-space indented
    pub fn save(&self, doc: &SettingsDocument) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::file(parent, e))?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, json).map_err(|e| AppError::file(&self.path, e))?;
        debug!("Settings saved to {}", self.path.display());
        Ok(())
    }

    /// Persist the first-run document. Callers gate this on `exists()`.
    pub fn create(&self, doc: &SettingsDocument) -> AppResult<()> {
        self.save(doc)?;
        info!("Settings created at {}", self.path.display());
        Ok(())
    }
}
