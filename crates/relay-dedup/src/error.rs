//! Error types for the dedup store.

use thiserror::Error;

/// Errors from the dedup store or its cache backend.
#[derive(Debug, Error)]
pub enum DedupError {
    /// The cache backend failed or is unreachable.
    #[error("cache error: {0}")]
    Backend(String),

    /// A key was written but the cache did not keep an expiry on it.
    #[error("expiry was not applied to key {0}")]
    TtlNotApplied(String),
}

/// Result type for dedup operations.
pub type Result<T> = std::result::Result<T, DedupError>;

impl From<redis::RedisError> for DedupError {
    fn from(e: redis::RedisError) -> Self {
        DedupError::Backend(e.to_string())
    }
}
