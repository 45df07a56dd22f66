//! Relay configuration.
//!
//! Settings come from a YAML file (`config.yaml` by default) and a handful of
//! environment variables that take precedence over the file, so secrets can
//! stay out of it.
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN`: Bot token from @BotFather
//! - `TELEGRAM_CHAT_ID`: Parent chat that receives notifications
//! - `FRIGATE_URL`: Base URL of the Frigate API
//! - `REDIS_URL`: Full Redis URL, replaces `redis_addr`/`redis_password`/`redis_db`
//! - `MQTT_BROKER`: Broker URL, e.g. `tcp://mqtt.local:1883`

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::{CoreError, Result};
use crate::routing::RoutingTable;

/// Environment variable overriding `telegram_token`.
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable overriding `telegram_chat_id`.
pub const TELEGRAM_CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// Environment variable overriding `frigate_url`.
pub const FRIGATE_URL_ENV: &str = "FRIGATE_URL";

/// Environment variable overriding the Redis connection.
pub const REDIS_URL_ENV: &str = "REDIS_URL";

/// Environment variable overriding `mqtt_broker`.
pub const MQTT_BROKER_ENV: &str = "MQTT_BROKER";

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MQTTS_PORT: u16 = 8883;

/// Which expiring cache backs the dedup store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Shared Redis instance; survives restarts.
    #[default]
    Redis,
    /// Process-local map; for development only.
    Memory,
}

/// Parsed MQTT broker address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

/// Full relay configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub mqtt_broker: String,
    pub mqtt_user: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic: String,
    pub mqtt_client_id: String,
    pub telegram_token: String,
    pub telegram_chat_id: i64,
    /// Route notifications to per-camera topics.
    pub use_thread_ids: bool,
    pub frigate_url: String,
    pub redis_addr: String,
    pub redis_password: Option<String>,
    pub redis_db: i64,
    /// Set from `REDIS_URL`; wins over the split redis settings.
    #[serde(skip)]
    pub redis_url_override: Option<String>,
    /// Whole hours added to event timestamps in captions.
    #[serde(alias = "timezone_ajust")]
    pub timezone_adjust: i32,
    /// `camera|threadId` entries.
    pub groups: Vec<String>,
    pub dedup_ttl_hours: u64,
    pub clip_max_attempts: u32,
    pub clip_timeout_secs: u64,
    pub snapshot_timeout_secs: u64,
    pub cache_backend: CacheBackend,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mqtt_broker: "tcp://localhost:1883".to_string(),
            mqtt_user: None,
            mqtt_password: None,
            mqtt_topic: "frigate/events".to_string(),
            mqtt_client_id: "frigate-event-listener".to_string(),
            telegram_token: String::new(),
            telegram_chat_id: 0,
            use_thread_ids: false,
            frigate_url: "http://localhost:5000".to_string(),
            redis_addr: "localhost:6379".to_string(),
            redis_password: None,
            redis_db: 0,
            redis_url_override: None,
            timezone_adjust: 0,
            groups: Vec::new(),
            dedup_ttl_hours: 2,
            clip_max_attempts: 9,
            clip_timeout_secs: 120,
            snapshot_timeout_secs: 10,
            cache_backend: CacheBackend::Redis,
        }
    }
}

impl RelayConfig {
    /// Load from a YAML file, apply environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_yaml_str(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse YAML without validating.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(TELEGRAM_TOKEN_ENV) {
            self.telegram_token = token;
        }
        if let Some(chat_id) = lookup(TELEGRAM_CHAT_ID_ENV).and_then(|v| v.trim().parse().ok()) {
            self.telegram_chat_id = chat_id;
        }
        if let Some(url) = lookup(FRIGATE_URL_ENV) {
            self.frigate_url = url;
        }
        if let Some(url) = lookup(REDIS_URL_ENV) {
            self.redis_url_override = Some(url);
        }
        if let Some(broker) = lookup(MQTT_BROKER_ENV) {
            self.mqtt_broker = broker;
        }
    }

    /// Check required settings and ranges.
    pub fn validate(&self) -> Result<()> {
        if self.telegram_token.trim().is_empty() {
            return Err(CoreError::InvalidConfig(format!(
                "telegram_token is not set (config file or {})",
                TELEGRAM_TOKEN_ENV
            )));
        }
        if self.telegram_chat_id == 0 {
            return Err(CoreError::InvalidConfig(format!(
                "telegram_chat_id is not set (config file or {})",
                TELEGRAM_CHAT_ID_ENV
            )));
        }
        if !(1..=24).contains(&self.dedup_ttl_hours) {
            return Err(CoreError::InvalidConfig(format!(
                "dedup_ttl_hours must be between 1 and 24, got {}",
                self.dedup_ttl_hours
            )));
        }
        if self.clip_max_attempts == 0 {
            return Err(CoreError::InvalidConfig(
                "clip_max_attempts must be at least 1".to_string(),
            ));
        }
        self.mqtt_endpoint()?;
        Ok(())
    }

    /// Build the routing table from `groups`.
    pub fn routing_table(&self) -> RoutingTable {
        RoutingTable::from_entries(self.telegram_chat_id, &self.groups)
    }

    /// Parse `mqtt_broker` (`tcp://`, `mqtt://`, `ssl://` or `mqtts://`).
    pub fn mqtt_endpoint(&self) -> Result<MqttEndpoint> {
        let url = Url::parse(&self.mqtt_broker).map_err(|e| {
            CoreError::InvalidConfig(format!("invalid mqtt_broker '{}': {}", self.mqtt_broker, e))
        })?;

        let use_tls = match url.scheme() {
            "tcp" | "mqtt" => false,
            "ssl" | "tls" | "mqtts" => true,
            other => {
                return Err(CoreError::InvalidConfig(format!(
                    "unsupported mqtt_broker scheme: {}",
                    other
                )))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CoreError::InvalidConfig("mqtt_broker has no host".to_string()))?
            .to_string();
        let default_port = if use_tls { DEFAULT_MQTTS_PORT } else { DEFAULT_MQTT_PORT };

        Ok(MqttEndpoint {
            host,
            port: url.port().unwrap_or(default_port),
            use_tls,
        })
    }

    /// Redis connection URL.
    pub fn redis_url(&self) -> String {
        if let Some(url) = &self.redis_url_override {
            return url.clone();
        }
        match self.redis_password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => format!("redis://:{}@{}/{}", password, self.redis_addr, self.redis_db),
            None => format!("redis://{}/{}", self.redis_addr, self.redis_db),
        }
    }

    /// How long a handled event stays remembered.
    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.dedup_ttl_hours * 3600)
    }

    /// Overall budget for fetching and sending one clip.
    pub fn clip_timeout(&self) -> Duration {
        Duration::from_secs(self.clip_timeout_secs)
    }

    /// Per-request timeout for snapshot downloads.
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }
}
