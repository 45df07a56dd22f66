//! Frigate HTTP API client.
//!
//! Endpoints used:
//! - `GET  {base}/api/events/{id}/snapshot.jpg`
//! - `GET  {base}/api/events/{id}/clip.mp4`
//! - `GET  {base}/api/{camera}/latest.jpg`
//! - `POST {base}/api/events/{camera}/{label}/create`

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{MediaError, Result};
use crate::fetcher::BlobSource;

/// Label and source type attached to manual recordings.
const MANUAL_EVENT_LABEL: &str = "telegram";

/// Longest error body kept in [`MediaError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Outcome of a manual event request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedEvent {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub event_id: String,
}

/// Detection service operations the relay depends on.
#[async_trait]
pub trait DetectionService: Send + Sync {
    /// URL of the recorded clip for an event.
    fn clip_url(&self, event_id: &str) -> String;

    /// Snapshot of a tracked object (single attempt).
    async fn event_snapshot(&self, event_id: &str) -> Result<Vec<u8>>;

    /// Current frame from a camera.
    async fn latest_snapshot(&self, camera: &str) -> Result<Vec<u8>>;

    /// Start a manual recording event on a camera.
    async fn create_event(&self, camera: &str, duration_secs: u32) -> Result<CreatedEvent>;
}

/// reqwest-based Frigate client.
#[derive(Debug, Clone)]
pub struct FrigateClient {
    base_url: String,
    client: reqwest::Client,
    snapshot_timeout: Duration,
}

impl FrigateClient {
    /// Create a client for `base_url` (trailing slashes are ignored).
    pub fn new(base_url: &str, snapshot_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            snapshot_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn snapshot_url(&self, event_id: &str) -> String {
        format!("{}/api/events/{}/snapshot.jpg", self.base_url, event_id)
    }

    pub fn latest_snapshot_url(&self, camera: &str) -> String {
        format!("{}/api/{}/latest.jpg", self.base_url, camera)
    }

    pub fn create_event_url(&self, camera: &str) -> String {
        format!(
            "{}/api/events/{}/{}/create",
            self.base_url, camera, MANUAL_EVENT_LABEL
        )
    }

    /// GET `url`, optionally bounded by a per-request timeout.
    async fn get_bytes(&self, url: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let mut body = response.text().await.unwrap_or_default();
            truncate_utf8(&mut body, MAX_ERROR_BODY);
            return Err(MediaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        debug!(url = %url, size = bytes.len(), "Downloaded media");
        Ok(bytes.to_vec())
    }
}

/// Request body for a manual event lasting `duration_secs`.
pub fn create_event_body(duration_secs: u32) -> serde_json::Value {
    serde_json::json!({
        "duration": duration_secs,
        "source_type": MANUAL_EVENT_LABEL,
        "sub_label": MANUAL_EVENT_LABEL,
        "score": 0,
        "include_recording": true,
        "draw": {}
    })
}

fn truncate_utf8(s: &mut String, max: usize) {
    if s.len() <= max {
        return;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

#[async_trait]
impl BlobSource for FrigateClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(url, None).await
    }
}

#[async_trait]
impl DetectionService for FrigateClient {
    fn clip_url(&self, event_id: &str) -> String {
        format!("{}/api/events/{}/clip.mp4", self.base_url, event_id)
    }

    async fn event_snapshot(&self, event_id: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get_bytes(&self.snapshot_url(event_id), Some(self.snapshot_timeout))
            .await?;
        if bytes.is_empty() {
            return Err(MediaError::EmptyBody);
        }
        Ok(bytes)
    }

    async fn latest_snapshot(&self, camera: &str) -> Result<Vec<u8>> {
        let bytes = self
            .get_bytes(&self.latest_snapshot_url(camera), Some(self.snapshot_timeout))
            .await?;
        if bytes.is_empty() {
            return Err(MediaError::EmptyBody);
        }
        Ok(bytes)
    }

    async fn create_event(&self, camera: &str, duration_secs: u32) -> Result<CreatedEvent> {
        let response = self
            .client
            .post(self.create_event_url(camera))
            .timeout(self.snapshot_timeout)
            .json(&create_event_body(duration_secs))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_utf8(&mut body, MAX_ERROR_BODY);
            return Err(MediaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreatedEvent = response.json().await?;
        if !created.success {
            return Err(MediaError::Api(created.message));
        }

        debug!(camera = %camera, event_id = %created.event_id, duration_secs, "Manual event created");
        Ok(created)
    }
}
