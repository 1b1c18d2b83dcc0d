//! Error types for lock file operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from lock file read, write, and validation.
#[derive(Error, Debug)]
pub enum LockfileError {
    /// IO failure with path context.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The writer was committed without content.
    #[error("no content set on atomic writer")]
    NoContent,

    /// Written bytes did not verify before rename.
    #[error("integrity error: expected {expected}, wrote {actual}")]
    Integrity {
        /// Expected blake3 hex.
        expected: String,
        /// Actual blake3 hex.
        actual: String,
    },

    /// The advisory lock could not be acquired in time.
    #[error("timed out acquiring lock on {path} after {timeout:?}")]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// Configured timeout.
        timeout: Duration,
    },

    /// A recorded library key is not `name/version`.
    #[error("invalid library key '{0}'")]
    InvalidLibraryKey(String),
}

impl LockfileError {
    /// Create an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<LockfileError> for caravel_core::Error {
    fn from(err: LockfileError) -> Self {
        match err {
            LockfileError::Io { path, source } => Self::io(path, source),
            other => Self::LockInvalid(other.to_string()),
        }
    }
}

/// Result type for lock file operations.
pub type Result<T> = std::result::Result<T, LockfileError>;
