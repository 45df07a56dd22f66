//! Core types for Frigate Relay.
//!
//! This crate holds the pieces every other relay crate agrees on:
//! - [`Event`] - a decoded Frigate detection event
//! - [`RoutingTable`] - camera name to Telegram topic mapping
//! - [`event_caption`] - notification caption text
//! - [`RelayConfig`] - YAML/env configuration
//!
//! # Example
//!
//! ```
//! use relay_core::{Event, EventPhase, RoutingTable};
//!
//! let payload = br#"{
//!     "type": "new",
//!     "after": {
//!         "id": "1700000000.1-abc",
//!         "label": "person",
//!         "camera": "front",
//!         "start_time": 1700000000.1,
//!         "has_snapshot": true,
//!         "has_clip": false
//!     }
//! }"#;
//!
//! let event = Event::decode(payload).unwrap();
//! assert_eq!(event.phase, EventPhase::New);
//!
//! let routing = RoutingTable::from_entries(-100123, ["front|42"]);
//! assert_eq!(routing.resolve(&event.source).thread_id, Some(42));
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod event;
pub mod routing;

pub use caption::{event_caption, format_duration};
pub use config::{CacheBackend, MqttEndpoint, RelayConfig};
pub use error::{CoreError, Result};
pub use event::{Event, EventPhase};
pub use routing::{Destination, Route, RoutingTable};
