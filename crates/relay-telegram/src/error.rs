//! Error types for Telegram delivery and commands.

use relay_dedup::DedupError;
use relay_media::MediaError;
use thiserror::Error;

/// Errors that can occur while talking to Telegram or serving a command.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Bot API request failed.
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Thread id does not fit Telegram's message id type.
    #[error("Invalid thread id: {0}")]
    InvalidThread(i64),

    /// Detection service call failed.
    #[error("Frigate error: {0}")]
    Detection(#[from] MediaError),

    /// Dedup store call failed.
    #[error("Dedup store error: {0}")]
    Dedup(#[from] DedupError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<teloxide::RequestError> for TelegramError {
    fn from(e: teloxide::RequestError) -> Self {
        TelegramError::Request(e.to_string())
    }
}
