//! Background file logging for the ytdlp-interactive front-end
//!
//! Log records are handed to a writer thread over a channel so prompts and
//! external tool runs never wait on disk. The logger is installed as the
//! `log` facade backend; when the log file cannot be opened, `env_logger`
//! takes over on stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;

use crate::config::APP_NAME;

/// Entries buffered before a forced flush
const FLUSH_BATCH: usize = 10;

/// Idle time after which buffered entries are flushed
const IDLE_FLUSH: Duration = Duration::from_millis(200);

/// Messages understood by the writer thread
enum LogMessage {
    Entry(String),
    Flush,
    Shutdown,
}

/// Asynchronous logger that writes to a file without blocking the caller
pub struct AsyncLogger {
    sender: Mutex<mpsc::Sender<LogMessage>>,
    handle: Mutex<Option<std::thread::JoinHandle<()>>>,
    level: LevelFilter,
    path: PathBuf,
}

impl AsyncLogger {
    /// Create a logger appending to the platform log file
    pub fn new() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let path = Self::default_path()?;
        Ok(Self::with_path(&path, LevelFilter::Debug)?)
    }

    /// Create a logger appending to `path`
    pub fn with_path(path: &Path, level: LevelFilter) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let (tx, rx) = mpsc::channel::<LogMessage>();
        let handle = std::thread::spawn(move || {
            let mut file = std::io::BufWriter::new(log_file);
            let mut pending = 0usize;
            loop {
                match rx.recv_timeout(IDLE_FLUSH) {
                    Ok(LogMessage::Entry(line)) => {
                        let _ = writeln!(file, "{}", line);
                        pending += 1;
                        if pending >= FLUSH_BATCH {
                            let _ = file.flush();
                            pending = 0;
                        }
                    }
                    Ok(LogMessage::Flush) | Err(mpsc::RecvTimeoutError::Timeout) => {
                        if pending > 0 {
                            let _ = file.flush();
                            pending = 0;
                        }
                    }
                    Ok(LogMessage::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                        let _ = file.flush();
                        return;
                    }
                }
            }
        });

        Ok(AsyncLogger {
            sender: Mutex::new(tx),
            handle: Mutex::new(Some(handle)),
            level,
            path: path.to_path_buf(),
        })
    }

    /// Platform log file location
    pub fn default_path() -> std::io::Result<PathBuf> {
        #[cfg(windows)]
        {
            let exe_path = std::env::current_exe()?;
            let exe_dir = exe_path.parent().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get executable directory")
            })?;
            Ok(exe_dir.join("ytdlp_interactive_log.txt"))
        }

        #[cfg(not(windows))]
        {
            if let Ok(xdg_dirs) = xdg::BaseDirectories::new() {
                Ok(xdg_dirs.get_cache_home().join(APP_NAME).join(format!("{}.log", APP_NAME)))
            } else {
                let home_dir = dirs::home_dir().ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "Failed to get home directory")
                })?;
                Ok(home_dir.join(format!(".{}", APP_NAME)).join(format!("{}.log", APP_NAME)))
            }
        }
    }

    /// File this logger appends to
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn send(&self, msg: LogMessage) {
        if let Ok(sender) = self.sender.lock() {
            let _ = sender.send(msg);
        }
    }

    /// Flush pending entries and stop the writer thread
    pub fn shutdown(&self) {
        self.send(LogMessage::Shutdown);
        if let Ok(mut guard) = self.handle.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Log for AsyncLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        self.send(LogMessage::Entry(format!(
            "[{} {} {}] {}",
            record.level(),
            timestamp,
            record.target(),
            record.args()
        )));
    }

    fn flush(&self) {
        self.send(LogMessage::Flush);
    }
}

static LOGGER: OnceCell<AsyncLogger> = OnceCell::new();

/// Install the global logger, falling back to env_logger on stderr
pub fn setup_logging() {
    match LOGGER.get_or_try_init(AsyncLogger::new) {
        Ok(logger) => {
            if log::set_logger(logger).is_ok() {
                log::set_max_level(logger.level);
            }
        }
        Err(e) => {
            eprintln!("Failed to open log file: {}. Logging to stderr.", e);
            let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
                .try_init();
        }
    }
}

/// Flush and stop the global file logger, if one was installed
pub fn shutdown_logging() {
    if let Some(logger) = LOGGER.get() {
        logger.shutdown();
    }
}
