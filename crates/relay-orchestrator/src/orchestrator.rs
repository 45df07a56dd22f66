//! Per-event dedup and delivery.
//!
//! Two kinds of events produce a notification:
//! - `new`/`update` with a snapshot: checked, fetched once, sent as a photo,
//!   then marked handled. A failed fetch or send leaves the event unmarked.
//! - `end` with a clip: checked, claimed atomically in the dedup store, then a
//!   separate task downloads the clip (with retries) and sends it as a video,
//!   all under one deadline.
//!
//! Everything else is ignored without touching the dedup store.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{event_caption, Event, RelayConfig};
use relay_dedup::DedupStore;
use relay_media::{DetectionService, FetchError, MediaFetcher};
use relay_telegram::Notifier;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::error::Result;

/// Tunables for event handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Whole hours added to timestamps in captions.
    pub timezone_adjust: i32,
    /// Download attempts per clip.
    pub clip_max_attempts: u32,
    /// Deadline for one clip's download and send together.
    pub clip_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timezone_adjust: 0,
            clip_max_attempts: 9,
            clip_timeout: Duration::from_secs(120),
        }
    }
}

impl OrchestratorConfig {
    /// Set the caption timezone offset in hours.
    pub fn with_timezone_adjust(mut self, hours: i32) -> Self {
        self.timezone_adjust = hours;
        self
    }

    /// Set the download attempts per clip.
    pub fn with_clip_max_attempts(mut self, attempts: u32) -> Self {
        self.clip_max_attempts = attempts;
        self
    }

    /// Set the per-clip deadline.
    pub fn with_clip_timeout(mut self, timeout: Duration) -> Self {
        self.clip_timeout = timeout;
        self
    }
}

impl From<&RelayConfig> for OrchestratorConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            timezone_adjust: config.timezone_adjust,
            clip_max_attempts: config.clip_max_attempts,
            clip_timeout: config.clip_timeout(),
        }
    }
}

/// How a clip delivery task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    Sent,
    FetchFailed,
    SendFailed,
    TimedOut,
}

/// Handle to a running clip delivery.
///
/// Dropping it leaves the task running.
#[derive(Debug)]
pub struct ClipTask {
    handle: JoinHandle<ClipOutcome>,
}

impl ClipTask {
    /// Wait for the task. `None` if it panicked or was aborted.
    pub async fn join(self) -> Option<ClipOutcome> {
        self.handle.await.ok()
    }
}

/// What happened to one event.
#[derive(Debug)]
pub enum Disposition {
    /// Not a notifiable phase/media combination.
    Ignored,
    /// Already handled.
    Skipped,
    /// The dedup store could not be queried; nothing was sent.
    DedupUnavailable,
    /// Snapshot sent.
    Delivered,
    /// Snapshot fetch or send failed; the event stays unmarked.
    Failed,
    /// Clip delivery started in the background.
    ClipDispatched(ClipTask),
}

/// Decides what to do with each event and drives fetch and delivery.
#[derive(Clone)]
pub struct EventOrchestrator {
    dedup: DedupStore,
    detection: Arc<dyn DetectionService>,
    fetcher: MediaFetcher,
    notifier: Arc<dyn Notifier>,
    config: OrchestratorConfig,
}

impl EventOrchestrator {
    pub fn new(
        dedup: DedupStore,
        detection: Arc<dyn DetectionService>,
        fetcher: MediaFetcher,
        notifier: Arc<dyn Notifier>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            dedup,
            detection,
            fetcher,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Decode a transport payload and handle it.
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<Disposition> {
        let event = Event::decode(payload)?;
        Ok(self.handle_event(event).await)
    }

    /// Handle one decoded event.
    pub async fn handle_event(&self, event: Event) -> Disposition {
        if event.wants_snapshot() {
            self.deliver_snapshot(&event).await
        } else if event.wants_clip() {
            self.dispatch_clip(event).await
        } else {
            trace!(event_id = %event.id, phase = %event.phase, "Nothing to deliver");
            Disposition::Ignored
        }
    }

    /// `Some(disposition)` if the event must not be processed further.
    async fn check_handled(&self, event: &Event) -> Option<Disposition> {
        match self.dedup.is_handled(&event.id, event.phase).await {
            Ok(false) => None,
            Ok(true) => {
                debug!(event_id = %event.id, phase = %event.phase, "Already handled, skipping");
                Some(Disposition::Skipped)
            }
            Err(e) => {
                error!(
                    event_id = %event.id,
                    phase = %event.phase,
                    error = %e,
                    "Dedup check failed, skipping event"
                );
                Some(Disposition::DedupUnavailable)
            }
        }
    }

    async fn deliver_snapshot(&self, event: &Event) -> Disposition {
        if let Some(disposition) = self.check_handled(event).await {
            return disposition;
        }

        info!(
            event_id = %event.id,
            phase = %event.phase,
            camera = %event.source,
            label = %event.label,
            "Delivering snapshot"
        );

        let photo = match self.detection.event_snapshot(&event.id).await {
            Ok(photo) => photo,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Snapshot fetch failed");
                return Disposition::Failed;
            }
        };

        let caption = event_caption(event, self.config.timezone_adjust);
        if let Err(e) = self.notifier.send_photo(&event.source, photo, &caption).await {
            warn!(event_id = %event.id, error = %e, "Snapshot send failed");
            return Disposition::Failed;
        }

        if let Err(e) = self.dedup.mark_handled(&event.id, event.phase).await {
            error!(event_id = %event.id, phase = %event.phase, error = %e, "Snapshot sent but not marked handled");
        }
        Disposition::Delivered
    }

    async fn dispatch_clip(&self, event: Event) -> Disposition {
        if let Some(disposition) = self.check_handled(&event).await {
            return disposition;
        }

        // Claimed before the download starts so a redelivery during a long
        // fetch, or a concurrent copy of this event, does not start a second one.
        match self.dedup.try_mark_handled(&event.id, event.phase).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(event_id = %event.id, "Clip already claimed, skipping");
                return Disposition::Skipped;
            }
            Err(e) => {
                error!(event_id = %event.id, error = %e, "Failed to mark clip handled, delivering anyway");
            }
        }

        let url = self.detection.clip_url(&event.id);
        let caption = event_caption(&event, self.config.timezone_adjust);
        let deadline = Instant::now() + self.config.clip_timeout;
        let attempts = self.config.clip_max_attempts;
        let fetcher = self.fetcher.clone();
        let notifier = Arc::clone(&self.notifier);

        info!(event_id = %event.id, camera = %event.source, url = %url, "Dispatching clip delivery");

        let handle = tokio::spawn(async move {
            let work = async {
                let video = match fetcher.fetch(&url, attempts, deadline).await {
                    Ok(video) => video,
                    Err(FetchError::TimedOut { attempts }) => {
                        warn!(event_id = %event.id, attempts, "Clip download timed out");
                        return ClipOutcome::TimedOut;
                    }
                    Err(e) => {
                        warn!(event_id = %event.id, error = %e, "Clip download failed");
                        return ClipOutcome::FetchFailed;
                    }
                };

                match notifier.send_video(&event.source, video, &caption).await {
                    Ok(()) => ClipOutcome::Sent,
                    Err(e) => {
                        warn!(event_id = %event.id, error = %e, "Clip send failed");
                        ClipOutcome::SendFailed
                    }
                }
            };

            match timeout_at(deadline, work).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(event_id = %event.id, "Clip delivery timed out");
                    ClipOutcome::TimedOut
                }
            }
        });

        Disposition::ClipDispatched(ClipTask { handle })
    }
}
