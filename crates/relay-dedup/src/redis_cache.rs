//! Redis backend for the expiring cache.
//!
//! Uses a `ConnectionManager`, which reconnects on its own after transient
//! failures and is cheap to clone per command.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::cache::ExpiringCache;
use crate::error::Result;

/// Redis-backed [`ExpiringCache`].
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connect to `url` (e.g. `redis://:password@localhost:6379/0`) and verify with PING.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection_manager().await?;
        let cache = Self { conn };

        cache.ping().await?;
        info!("Connected to Redis");
        Ok(cache)
    }
}

#[async_trait]
impl ExpiringCache for RedisCache {
    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SET EX rejects 0; sub-second TTLs round up.
        let seconds = ttl.as_secs().max(1);
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let seconds = ttl.as_secs().max(1);
        // SET NX answers OK when written, nil when the key exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let mut conn = self.conn.clone();
        // -2: key missing, -1: no expiry
        let ttl: i64 = conn.ttl(key).await?;
        Ok(u64::try_from(ttl).ok().map(Duration::from_secs))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", prefix);

        let keys: Vec<String> = {
            let mut iter = conn.scan_match::<_, String>(&pattern).await?;
            let mut keys = Vec::new();
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
            keys
        };

        if keys.is_empty() {
            return Ok(0);
        }

        let removed: u64 = conn.del(&keys).await?;
        debug!(pattern = %pattern, removed, "Deleted cache keys");
        Ok(removed)
    }
}
