//! Telegram delivery and chat commands for Frigate Relay.
//!
//! - [`Notifier`] / [`TelegramNotifier`] - text, photo and video delivery to
//!   the camera's topic (or the default chat)
//! - [`CommandOrchestrator`] - `/status`, `/clean`, `/snapshot`, `/record`,
//!   `/restart` and `/help`
//! - [`RelayBot`] - the long-polling command dispatcher
//!
//! # Commands
//!
//! - `/status` - uptime, CPU cores, version and the topic's camera
//! - `/clean` - forget handled events
//! - `/snapshot` - live snapshot from the topic's camera
//! - `/record [seconds]` - start a manual recording (default 10s)
//! - `/restart` - stop the process so the supervisor restarts it
//! - `/help` - list commands

pub mod bot;
pub mod commands;
pub mod error;
pub mod notifier;

pub use bot::RelayBot;
pub use commands::{Command, CommandOrchestrator, Reply, DEFAULT_RECORD_SECS};
pub use error::{Result, TelegramError};
pub use notifier::{DeliveryRouter, Notifier, TelegramNotifier};
