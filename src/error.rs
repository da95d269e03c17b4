//! Error taxonomy for the interactive front-end

use std::path::PathBuf;

/// Errors surfaced by every fallible operation in the crate
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0} is not installed or not on PATH")]
    PrerequisiteMissing(String),

    #[error("You are not connected to the internet")]
    Connectivity,

    #[error("Failed to parse JSON from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to access {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Command failed with code {code:?}: {stderr}")]
    ExternalTool { code: Option<i32>, stderr: String },

    #[error("{0}")]
    Validation(String),

    #[error("Prompt error: {0}")]
    Prompt(dialoguer::Error),

    #[error("Closed by user")]
    Cancelled,
}

pub type AppResult<T> = Result<T, AppError>;

impl From<dialoguer::Error> for AppError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(ref io) if io.kind() == std::io::ErrorKind::Interrupted => AppError::Cancelled,
            other => AppError::Prompt(other),
        }
    }
}

impl AppError {
    /// Attach a path to an IO failure
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File { path: path.into(), source }
    }

    /// Attach a path to a JSON parse failure
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        AppError::Parse { path: path.into(), source }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Cancelled => 0,
            _ => 1,
        }
    }

    /// Extra guidance printed alongside fatal errors
    pub fn recovery_hint(&self) -> Option<String> {
        match self {
            AppError::Parse { path, .. } => Some(format!(
                "The file {} may be corrupt. Fix or remove it manually; it was left untouched.",
                path.display()
            )),
            AppError::PrerequisiteMissing(tool) => {
                Some(format!("Install {} and make sure it is on your PATH.", tool))
            }
            AppError::Connectivity => Some("Check your network connection and try again.".to_string()),
            _ => None,
        }
    }
}
