//! External tool discovery and invocation
//!
//! This module locates the downloader and muxer binaries, reads their
//! versions, and runs the downloader for metadata fetches and downloads.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use console::style;
use futures::{AsyncBufReadExt, StreamExt};
use log::{debug, error, info};

use crate::arguments::ArgumentList;
use crate::config::{DOWNLOADER_BIN, FLAG_OUTPUT, FLAG_SKIP_DOWNLOAD, FLAG_WRITE_INFO_JSON, MUXER_BIN};
use crate::error::{AppError, AppResult};
use crate::metadata_cache::MetadataSource;
use crate::settings::ToolInventory;

/// Discovery and version probing of the external binaries
pub struct ToolManager;

impl ToolManager {
    /// Absolute path of `name` on PATH
    pub fn find_binary(name: &str) -> Option<PathBuf> {
        match which::which(name) {
            Ok(path) => {
                debug!("Found {} at {}", name, path.display());
                Some(path)
            }
            Err(e) => {
                debug!("{} not found on PATH: {}", name, e);
                None
            }
        }
    }

    /// First line of a tool's version output
    pub fn get_version(program: &Path, version_flag: &str) -> Option<String> {
        let output = Self::run_command_hidden(&program.to_string_lossy(), &[version_flag]).ok()?;
        if !output.status.success() {
            debug!("{} {} exited with {}", program.display(), version_flag, output.status);
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().next().map(|line| line.trim().to_string()).filter(|line| !line.is_empty())
    }

    /// Locate both binaries and read their versions
    pub fn probe() -> AppResult<ToolInventory> {
        let downloader_path =
            Self::find_binary(DOWNLOADER_BIN).ok_or_else(|| AppError::PrerequisiteMissing(DOWNLOADER_BIN.to_string()))?;
        let downloader_version = Self::get_version(&downloader_path, "--version")
            .ok_or_else(|| AppError::PrerequisiteMissing(DOWNLOADER_BIN.to_string()))?;
        info!("{} {} at {}", DOWNLOADER_BIN, downloader_version, downloader_path.display());

        let muxer_path =
            Self::find_binary(MUXER_BIN).ok_or_else(|| AppError::PrerequisiteMissing(MUXER_BIN.to_string()))?;
        let muxer_version = Self::get_version(&muxer_path, "-version")
            .ok_or_else(|| AppError::PrerequisiteMissing(MUXER_BIN.to_string()))?;
        info!("{} found at {}", muxer_version, muxer_path.display());

        Ok(ToolInventory {
            downloader_path: downloader_path.to_string_lossy().to_string(),
            downloader_version,
            muxer_path: muxer_path.to_string_lossy().to_string(),
            muxer_version,
        })
    }

    /// Run a short command with captured output and no console window
    pub fn run_command_hidden(cmd: &str, args: &[&str]) -> io::Result<std::process::Output> {
        let mut command = Command::new(cmd);
        command.args(args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(0x08000000); // CREATE_NO_WINDOW
        }

        command.output()
    }
}

/// Metadata and thumbnails fetched through the real downloader and HTTP
pub struct YtDlp {
    downloader_path: String,
    client: reqwest::Client,
}

impl YtDlp {
    pub fn new(downloader_path: &str, client: reqwest::Client) -> Self {
        Self { downloader_path: downloader_path.to_string(), client }
    }
}

impl MetadataSource for YtDlp {
    async fn fetch_info_json(&self, video_url: &str, output_stem: &Path) -> AppResult<()> {
        let args = [
            FLAG_SKIP_DOWNLOAD.to_string(),
            FLAG_OUTPUT.to_string(),
            output_stem.to_string_lossy().to_string(),
            FLAG_WRITE_INFO_JSON.to_string(),
            video_url.to_string(),
        ];
        debug!("Fetching metadata: {} {:?}", self.downloader_path, args);
        let output = async_process::Command::new(&self.downloader_path)
            .args(&args)
            .stdin(async_process::Stdio::null())
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("Metadata fetch failed ({:?}): {}", output.status.code(), stderr);
            return Err(AppError::ExternalTool { code: output.status.code(), stderr });
        }
        Ok(())
    }

    async fn fetch_thumbnail(&self, url: &str) -> AppResult<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Run the assembled downloader command.
///
/// Progress on stdout goes straight to the terminal; stderr is echoed and
/// kept so a failure can be reported with its diagnostics.
pub async fn run_download(args: &ArgumentList) -> AppResult<()> {
    let program = args
        .program()
        .ok_or_else(|| AppError::Validation("Downloader path is not set".to_string()))?;
    info!("Running {} {:?}", program, args.args());

    let mut child = async_process::Command::new(program)
        .args(args.args())
        .stdin(async_process::Stdio::null())
        .stdout(async_process::Stdio::inherit())
        .stderr(async_process::Stdio::piped())
        .spawn()?;

    let mut diagnostics = String::new();
    if let Some(stderr) = child.stderr.take() {
        let mut lines = futures::io::BufReader::new(stderr).lines();
        while let Some(line) = lines.next().await {
            let line = line?;
            eprintln!("{}", style(&line).red());
            diagnostics.push_str(&line);
            diagnostics.push('\n');
        }
    }

    let status = child.status().await?;
    if status.success() {
        info!("Download finished");
        Ok(())
    } else {
        error!("Download failed with {:?}", status.code());
        Err(AppError::ExternalTool { code: status.code(), stderr: diagnostics.trim_end().to_string() })
    }
}
