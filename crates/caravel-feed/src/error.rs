//! Error types for feed operations.

use thiserror::Error;

/// Errors from remote feed access.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Request failed after retries.
    #[error("feed request failed for {url}: {message}")]
    Request {
        /// Request URL.
        url: String,
        /// Underlying failure.
        message: String,
    },

    /// The feed answered with an unexpected status.
    #[error("feed {url} answered {status}")]
    Status {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The feed's response body could not be parsed.
    #[error("invalid feed response from {url}: {message}")]
    InvalidResponse {
        /// Request URL.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// The archive exceeded the in-memory download bound.
    #[error("archive from {url} exceeds the {limit} byte download limit")]
    TooLarge {
        /// Request URL.
        url: String,
        /// Configured bound.
        limit: usize,
    },

    /// A malformed feed or request URL.
    #[error("invalid feed url: {0}")]
    InvalidUrl(String),
}

impl From<FeedError> for caravel_core::Error {
    fn from(err: FeedError) -> Self {
        let url = match &err {
            FeedError::Request { url, .. }
            | FeedError::Status { url, .. }
            | FeedError::InvalidResponse { url, .. }
            | FeedError::TooLarge { url, .. } => Some(url.clone()),
            FeedError::InvalidUrl(_) => None,
        };
        Self::feed(err.to_string(), url)
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
