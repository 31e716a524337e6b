//! Error types for tabvault operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TabvaultError>;

#[derive(Error, Debug)]
pub enum TabvaultError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Structural error in {path}: {message}")]
    Structural { path: PathBuf, message: String },

    #[error("Could not rotate {path} to {backup}: {source}")]
    BackupRotation {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to {operation} {path}: {source}")]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Downstream loader failed: {message}")]
    Loader { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl TabvaultError {
    pub fn structural(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Structural {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn filesystem(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Filesystem {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn loader(msg: impl Into<String>) -> Self {
        Self::Loader {
            message: msg.into(),
        }
    }

    /// Whether this failure means the tabular content itself is unusable,
    /// as opposed to the filesystem refusing an operation.
    pub fn aborts_diff(&self) -> bool {
        matches!(self, Self::Structural { .. } | Self::Csv(_))
    }
}
