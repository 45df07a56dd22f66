//! Process-local expiring cache.
//!
//! Forgets everything on restart, so it only suits tests and local runs
//! without Redis. Expired entries are dropped on every write.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::cache::ExpiringCache;
use crate::error::Result;

#[derive(Debug, Clone)]
struct Entry {
    #[allow(dead_code)]
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn new(value: &str, expires_at: Instant) -> Self {
        Self {
            value: value.to_string(),
            expires_at,
        }
    }
}

/// In-memory [`ExpiringCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }

    /// Whether the cache holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ExpiringCache for MemoryCache {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(true),
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        reap(&mut entries, now);
        entries.insert(key.to_string(), Entry::new(value, now + ttl));
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        reap(&mut entries, now);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry::new(value, now + ttl));
        Ok(true)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.expires_at - now))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        reap(&mut entries, Instant::now());
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

/// Drop entries whose expiry has passed.
fn reap(entries: &mut HashMap<String, Entry>, now: Instant) {
    entries.retain(|_, e| e.expires_at > now);
}
