//! Chat commands.
//!
//! The active camera for a command is the one whose topic the command was
//! sent in. Commands outside a mapped topic get "no camera selected" rather
//! than acting on a default camera.

use std::sync::Arc;
use std::time::Instant;

use relay_core::{format_duration, Destination, RoutingTable};
use relay_dedup::DedupStore;
use relay_media::DetectionService;
use teloxide::utils::command::BotCommands;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::notifier::Notifier;

/// Recording length when `/record` has no argument.
pub const DEFAULT_RECORD_SECS: u32 = 10;

const NO_CAMERA: &str = "⚠️ No camera selected. Send this command from a camera topic.";

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Show relay status")]
    Status,

    #[command(description = "Forget handled events")]
    Clean,

    #[command(description = "Live snapshot from this topic's camera")]
    Snapshot,

    #[command(description = "Record a clip on this topic's camera: /record [seconds]")]
    Record(String),

    #[command(description = "Restart the relay")]
    Restart,

    #[command(description = "Show this help")]
    Help,
}

/// What the dispatcher should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send this text back to where the command came from.
    Text(String),
    /// The command already delivered its own response.
    Sent,
    /// Send this text, then shut the process down.
    Restart(String),
}

/// Parse the `/record` argument. Empty means the default length.
pub fn parse_duration(args: &str) -> std::result::Result<u32, String> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(DEFAULT_RECORD_SECS);
    }
    match args.parse::<u32>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(format!(
            "❌ Invalid duration '{}'. Usage: /record [seconds], e.g. /record 30",
            args
        )),
    }
}

/// Reply for a `/something` that did not parse as a [`Command`].
pub fn unknown_command_reply(text: &str) -> String {
    format!(
        "Unknown command: {}\n\nUse /help to see available commands.",
        text.split_whitespace().next().unwrap_or(text)
    )
}

/// Runs chat commands against the detection service and the dedup store.
pub struct CommandOrchestrator {
    detection: Arc<dyn DetectionService>,
    notifier: Arc<dyn Notifier>,
    dedup: DedupStore,
    routing: Arc<RoutingTable>,
    started: Instant,
    shutdown: watch::Sender<bool>,
}

impl CommandOrchestrator {
    pub fn new(
        detection: Arc<dyn DetectionService>,
        notifier: Arc<dyn Notifier>,
        dedup: DedupStore,
        routing: Arc<RoutingTable>,
        shutdown: watch::Sender<bool>,
    ) -> Self {
        Self {
            detection,
            notifier,
            dedup,
            routing,
            started: Instant::now(),
            shutdown,
        }
    }

    /// Camera owning the topic a command arrived on.
    ///
    /// Only topics of the configured chat map to cameras.
    pub fn camera_for(&self, origin: Destination) -> Option<&str> {
        if origin.chat_id != self.routing.default_chat_id() {
            return None;
        }
        origin
            .thread_id
            .and_then(|tid| self.routing.source_for_thread(tid))
    }

    /// Run a command that arrived on `origin`.
    pub async fn handle(&self, cmd: Command, origin: Destination) -> Reply {
        match cmd {
            Command::Status => Reply::Text(self.status(origin)),
            Command::Clean => Reply::Text(self.clean().await),
            Command::Snapshot => self.snapshot(origin).await,
            Command::Record(args) => Reply::Text(self.record(&args, origin).await),
            Command::Restart => {
                Reply::Restart("🔄 Restarting Frigate Relay...".to_string())
            }
            Command::Help => Reply::Text(Command::descriptions().to_string()),
        }
    }

    /// Signal the process to stop.
    pub fn request_shutdown(&self) {
        info!("Shutdown requested from chat");
        if self.shutdown.send(true).is_err() {
            warn!("No shutdown listener, ignoring restart request");
        }
    }

    fn status(&self, origin: Destination) -> String {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut text = format!(
            "✅ Frigate Relay is running\n\
             ⏱ Uptime: {}\n\
             🖥 CPU cores: {}\n\
             📦 Version: {}",
            format_duration(self.started.elapsed()),
            cores,
            env!("CARGO_PKG_VERSION"),
        );
        if let Some(camera) = self.camera_for(origin) {
            text.push_str(&format!("\n📷 Camera: {}", camera));
        }
        text
    }

    async fn clean(&self) -> String {
        match self.dedup.clear().await {
            Ok(removed) => format!("🧹 Cleared {} handled events", removed),
            Err(e) => {
                warn!(error = %e, "Failed to clear dedup store");
                format!("❌ Failed to clear handled events: {}", e)
            }
        }
    }

    async fn snapshot(&self, origin: Destination) -> Reply {
        let Some(camera) = self.camera_for(origin) else {
            return Reply::Text(NO_CAMERA.to_string());
        };

        let photo = match self.detection.latest_snapshot(camera).await {
            Ok(photo) => photo,
            Err(e) => {
                warn!(camera = %camera, error = %e, "Snapshot request failed");
                return Reply::Text(format!("❌ Failed to get snapshot from {}: {}", camera, e));
            }
        };

        let caption = format!("Snapshot from camera {}", camera);
        match self.notifier.send_photo_to(origin, photo, &caption).await {
            Ok(()) => Reply::Sent,
            Err(e) => {
                warn!(camera = %camera, error = %e, "Failed to send snapshot");
                Reply::Text(format!("❌ Failed to send snapshot: {}", e))
            }
        }
    }

    async fn record(&self, args: &str, origin: Destination) -> String {
        let duration = match parse_duration(args) {
            Ok(duration) => duration,
            Err(reply) => return reply,
        };
        let Some(camera) = self.camera_for(origin) else {
            return NO_CAMERA.to_string();
        };

        match self.detection.create_event(camera, duration).await {
            Ok(created) => {
                info!(camera = %camera, duration, event_id = %created.event_id, "Manual recording started");
                format!(
                    "🎬 Recording {}s on {}\nEvent id: {}",
                    duration, camera, created.event_id
                )
            }
            Err(e) => {
                warn!(camera = %camera, error = %e, "Manual recording failed");
                format!("❌ Failed to start recording on {}: {}", camera, e)
            }
        }
    }
}
