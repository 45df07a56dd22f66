//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while decoding events or loading configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The transport payload was not a valid Frigate event.
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid YAML for [`crate::RelayConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A required setting is missing or out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
