//! Expiring cache contract.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Key/value cache whose entries expire.
///
/// Values carry no meaning for the relay; only key presence matters.
/// Implementations provide their own atomicity, callers add no locking.
#[async_trait]
pub trait ExpiringCache: Send + Sync {
    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Whether `key` is present and not expired.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Store `key` with an expiry, replacing any previous entry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Store `key` with an expiry only if no live entry exists.
    ///
    /// Returns `false` when the key was already present. The check and the
    /// write are one atomic step, so of several concurrent callers exactly
    /// one gets `true`.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Remaining lifetime of `key`.
    ///
    /// `None` when the key is missing or has no expiry.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64>;
}
