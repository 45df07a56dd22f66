//! Frigate detection events.
//!
//! Frigate publishes `{ "before": {...}, "after": {...}, "type": "new"|"update"|"end" }`
//! on its events topic. Only `after` and `type` matter to the relay.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Lifecycle stage of a tracked object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPhase {
    /// First sighting of the object.
    New,
    /// The object is still being tracked.
    Update,
    /// Tracking finished; the clip is final.
    End,
}

impl EventPhase {
    /// Wire name of the phase, as used in dedup keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Update => "update",
            Self::End => "end",
        }
    }
}

impl fmt::Display for EventPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object state as Frigate reports it in `before`/`after`.
#[derive(Debug, Clone, Deserialize)]
struct ObjectState {
    id: String,
    label: String,
    camera: String,
    start_time: f64,
    #[serde(default)]
    has_snapshot: bool,
    #[serde(default)]
    has_clip: bool,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    #[allow(dead_code)]
    before: Option<ObjectState>,
    after: ObjectState,
    #[serde(rename = "type")]
    phase: EventPhase,
}

/// Immutable snapshot of a detection at one point in time.
///
/// `(id, phase)` identifies the event for deduplication: one object yields a
/// `new`, any number of `update`s and a single `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Stable identifier of the tracked object.
    pub id: String,
    /// Lifecycle phase of this message.
    pub phase: EventPhase,
    /// Classification, e.g. "person".
    pub label: String,
    /// Camera name.
    pub source: String,
    /// Epoch seconds (fractional) when tracking started.
    pub start_time: f64,
    /// Frigate holds a snapshot for this object.
    pub has_snapshot: bool,
    /// Frigate holds a recorded clip for this object.
    pub has_clip: bool,
}

impl Event {
    /// Decode a raw MQTT payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let envelope: EventEnvelope = serde_json::from_slice(payload)?;
        let after = envelope.after;

        Ok(Self {
            id: after.id,
            phase: envelope.phase,
            label: after.label,
            source: after.camera,
            start_time: after.start_time,
            has_snapshot: after.has_snapshot,
            has_clip: after.has_clip,
        })
    }

    /// Whether this event should produce a snapshot notification.
    pub fn wants_snapshot(&self) -> bool {
        matches!(self.phase, EventPhase::New | EventPhase::Update) && self.has_snapshot
    }

    /// Whether this event should produce a clip notification.
    pub fn wants_clip(&self) -> bool {
        self.phase == EventPhase::End && self.has_clip
    }
}
