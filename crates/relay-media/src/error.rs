//! Error types for media retrieval.

use thiserror::Error;

/// A single request to the detection service failed.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-200 response.
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    /// 200 response without content.
    #[error("empty response body")]
    EmptyBody,

    /// Frigate answered but reported a failure.
    #[error("Frigate API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for MediaError {
    fn from(e: reqwest::Error) -> Self {
        MediaError::Http(e.to_string())
    }
}

/// A retried download gave up.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt failed; carries the last failure.
    #[error("failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: MediaError,
    },

    /// The deadline passed before any attempt succeeded.
    #[error("timed out after {attempts} attempts")]
    TimedOut { attempts: u32 },
}

/// Result type for single detection-service requests.
pub type Result<T> = std::result::Result<T, MediaError>;
