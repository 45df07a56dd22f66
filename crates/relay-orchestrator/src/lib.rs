//! Event dedup and delivery orchestration for Frigate Relay.
//!
//! [`EventOrchestrator`] decides, per Frigate event, whether a notification
//! is due, fetches the media and hands it to the notifier. [`MqttSubscriber`]
//! feeds it from the broker, one task per message.

pub mod error;
pub mod orchestrator;
pub mod subscriber;

pub use error::{OrchestratorError, Result};
pub use orchestrator::{ClipOutcome, ClipTask, Disposition, EventOrchestrator, OrchestratorConfig};
pub use subscriber::{mqtt_options, MqttSubscriber, RECONNECT_DELAY};

#[cfg(test)]
mod tests;
