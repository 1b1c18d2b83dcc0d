//! Error types for store operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from store layout, install, and archive handling.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO failure with path context.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Archive could not be read or extracted.
    #[error("archive error: {0}")]
    Archive(String),

    /// Archive bytes do not match the recorded sha.
    #[error("sha mismatch for {library}: expected {expected}, got {actual}")]
    ShaMismatch {
        /// `name/version` of the package.
        library: String,
        /// Expected base64 sha512.
        expected: String,
        /// Actual base64 sha512.
        actual: String,
    },

    /// Package directory exists but its metadata is missing or invalid.
    #[error("invalid package metadata at {path}: {message}")]
    InvalidMetadata {
        /// Metadata path.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

impl StoreError {
    /// Create an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for caravel_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io { path, source } => Self::io(path, source),
            StoreError::Archive(msg) => Self::Archive(msg),
            StoreError::ShaMismatch {
                library,
                expected,
                actual,
            } => Self::ShaMismatch {
                library,
                expected,
                actual,
            },
            StoreError::InvalidMetadata { path, message } => Self::Archive(format!(
                "invalid package metadata at {}: {message}",
                path.display()
            )),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
