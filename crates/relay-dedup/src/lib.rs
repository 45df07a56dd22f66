//! Deduplication of handled events.
//!
//! The relay remembers which `(event id, phase)` pairs it already notified
//! about in an expiring key/value cache, so MQTT redeliveries and process
//! restarts do not produce duplicate Telegram messages.
//!
//! - [`ExpiringCache`] - minimal set-with-TTL / exists contract
//! - [`RedisCache`] - production backend
//! - [`MemoryCache`] - process-local backend for tests and development
//! - [`DedupStore`] - key layout and TTL verification on top of a cache

pub mod cache;
pub mod error;
pub mod memory;
pub mod redis_cache;
pub mod store;

pub use cache::ExpiringCache;
pub use error::{DedupError, Result};
pub use memory::MemoryCache;
pub use redis_cache::RedisCache;
pub use store::{DedupStore, DEFAULT_KEY_PREFIX};
