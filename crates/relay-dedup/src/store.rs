//! Dedup store on top of an expiring cache.

use std::sync::Arc;
use std::time::Duration;

use relay_core::EventPhase;
use tracing::{debug, info};

use crate::cache::ExpiringCache;
use crate::error::{DedupError, Result};

/// Namespace prepended to every key the relay writes.
pub const DEFAULT_KEY_PREFIX: &str = "frigate:";

/// Marker value; only key presence matters.
const HANDLED_VALUE: &str = "processed";

/// Remembers handled `(event id, phase)` pairs for a fixed window.
#[derive(Clone)]
pub struct DedupStore {
    cache: Arc<dyn ExpiringCache>,
    ttl: Duration,
    prefix: String,
}

impl DedupStore {
    /// Create a store with the default `frigate:` prefix.
    pub fn new(cache: Arc<dyn ExpiringCache>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    /// Use a different key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// How long handled events are remembered.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key for an event: `{prefix}event:{phase}:{id}`.
    pub fn key(&self, id: &str, phase: EventPhase) -> String {
        format!("{}event:{}:{}", self.prefix, phase, id)
    }

    /// Whether the event was already handled.
    pub async fn is_handled(&self, id: &str, phase: EventPhase) -> Result<bool> {
        self.cache.exists(&self.key(id, phase)).await
    }

    /// Record the event as handled.
    ///
    /// Fails with [`DedupError::TtlNotApplied`] if the cache did not keep the
    /// expiry, since such a key would never be forgotten.
    pub async fn mark_handled(&self, id: &str, phase: EventPhase) -> Result<()> {
        let key = self.key(id, phase);
        self.cache.set_with_ttl(&key, HANDLED_VALUE, self.ttl).await?;
        self.verify_ttl(&key).await
    }

    /// Record the event as handled unless another worker already did.
    ///
    /// `Ok(false)` means the key was present, so the caller lost the race
    /// and must not deliver. Expiry is verified as in [`Self::mark_handled`].
    pub async fn try_mark_handled(&self, id: &str, phase: EventPhase) -> Result<bool> {
        let key = self.key(id, phase);
        if !self.cache.set_if_absent(&key, HANDLED_VALUE, self.ttl).await? {
            debug!(key = %key, "Event already marked handled");
            return Ok(false);
        }
        self.verify_ttl(&key).await?;
        Ok(true)
    }

    async fn verify_ttl(&self, key: &str) -> Result<()> {
        match self.cache.ttl(key).await? {
            Some(_) => {
                debug!(key = %key, ttl_secs = self.ttl.as_secs(), "Event marked handled");
                Ok(())
            }
            None => Err(DedupError::TtlNotApplied(key.to_string())),
        }
    }

    /// Forget every handled event, returning how many keys were removed.
    pub async fn clear(&self) -> Result<u64> {
        let removed = self
            .cache
            .delete_prefix(&format!("{}event:", self.prefix))
            .await?;
        info!(removed, "Dedup store cleared");
        Ok(removed)
    }
}
