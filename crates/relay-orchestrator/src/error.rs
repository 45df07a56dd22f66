//! Error types for event orchestration.

use relay_core::CoreError;
use thiserror::Error;

/// Errors surfaced by the orchestrator and the MQTT subscriber.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed event payload or broker setting.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// MQTT client request failed.
    #[error("MQTT error: {0}")]
    Mqtt(String),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

impl From<rumqttc::ClientError> for OrchestratorError {
    fn from(e: rumqttc::ClientError) -> Self {
        OrchestratorError::Mqtt(e.to_string())
    }
}
