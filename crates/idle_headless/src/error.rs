//! Error type for headless commands.

use std::path::PathBuf;

use idle_core::error::GameError;
use thiserror::Error;

/// Result type alias using [`HeadlessError`].
pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Failures surfaced by the CLI.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// Failed to read or write a file.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Failed to parse a RON catalog.
    #[error("Failed to parse {}: {message}", path.display())]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
    /// Failed to encode a report.
    #[error("Failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
    /// The engine refused the data.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl HeadlessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
