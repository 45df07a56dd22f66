//! Clip downloads with retries, a deadline and a size ceiling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{FetchError, MediaError, Result};
use crate::retry::{retry_until, RetryError, RetryPolicy};

/// Largest attachment sent to Telegram (one MiB under the bot API limit).
pub const MEDIA_CEILING: usize = 49 * 1024 * 1024;

/// Pause between download attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Something that can GET a URL as bytes.
///
/// Implementations return an error for non-200 responses; dropping the
/// returned future must cancel the request.
#[async_trait]
pub trait BlobSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Downloads media with bounded retries.
#[derive(Clone)]
pub struct MediaFetcher {
    source: Arc<dyn BlobSource>,
    delay: Duration,
    ceiling: usize,
}

impl MediaFetcher {
    /// Create a fetcher with the default 2s delay and 49 MiB ceiling.
    pub fn new(source: Arc<dyn BlobSource>) -> Self {
        Self {
            source,
            delay: DEFAULT_RETRY_DELAY,
            ceiling: MEDIA_CEILING,
        }
    }

    /// Set the pause between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the byte ceiling.
    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Download `url`, retrying network errors, bad statuses and empty bodies.
    ///
    /// Gives up after `max_attempts` or at `deadline`, whichever comes first.
    /// Payloads larger than the ceiling are cut to exactly the ceiling.
    pub async fn fetch(
        &self,
        url: &str,
        max_attempts: u32,
        deadline: Instant,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let policy = RetryPolicy::new(max_attempts, self.delay);

        let result = retry_until(policy, deadline, |attempt| {
            let source = Arc::clone(&self.source);
            async move {
                if attempt > 1 {
                    info!(url = %url, attempt, max_attempts, "Retrying media download");
                }
                let bytes = source.get(url).await?;
                if bytes.is_empty() {
                    return Err(MediaError::EmptyBody);
                }
                Ok(bytes)
            }
        })
        .await;

        match result {
            Ok(bytes) => Ok(truncate_to_ceiling(bytes, self.ceiling)),
            Err(RetryError::Exhausted { attempts, last }) => {
                Err(FetchError::Exhausted { attempts, last })
            }
            Err(RetryError::TimedOut { attempts, .. }) => Err(FetchError::TimedOut { attempts }),
        }
    }
}

/// Cut `bytes` down to `ceiling` if larger.
pub fn truncate_to_ceiling(mut bytes: Vec<u8>, ceiling: usize) -> Vec<u8> {
    if bytes.len() > ceiling {
        warn!(size = bytes.len(), ceiling, "Media exceeds ceiling, truncating");
        bytes.truncate(ceiling);
    }
    bytes
}
