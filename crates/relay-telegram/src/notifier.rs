//! Outbound Telegram messages.

use std::sync::Arc;

use async_trait::async_trait;
use relay_core::{Destination, RoutingTable};
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ThreadId};
use tracing::{debug, info};

use crate::error::{Result, TelegramError};

/// Sends notifications to a chat destination.
///
/// Every send is a single request. Failures are returned, never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Destination for notifications about `source`.
    fn destination_for(&self, source: &str) -> Destination;

    async fn send_text_to(&self, dest: Destination, text: &str) -> Result<()>;

    async fn send_photo_to(&self, dest: Destination, photo: Vec<u8>, caption: &str)
        -> Result<()>;

    async fn send_video_to(&self, dest: Destination, video: Vec<u8>, caption: &str)
        -> Result<()>;

    /// Send a text message about `source`.
    async fn send_text(&self, source: &str, text: &str) -> Result<()> {
        let dest = self.destination_for(source);
        self.send_text_to(dest, text).await
    }

    /// Send a photo about `source`.
    async fn send_photo(&self, source: &str, photo: Vec<u8>, caption: &str) -> Result<()> {
        let dest = self.destination_for(source);
        self.send_photo_to(dest, photo, caption).await
    }

    /// Send a video about `source`.
    async fn send_video(&self, source: &str, video: Vec<u8>, caption: &str) -> Result<()> {
        let dest = self.destination_for(source);
        self.send_video_to(dest, video, caption).await
    }
}

/// Picks a destination from the routing table.
#[derive(Debug, Clone)]
pub struct DeliveryRouter {
    routing: Arc<RoutingTable>,
    use_threads: bool,
}

impl DeliveryRouter {
    /// With `use_threads` off, everything goes to the default chat.
    pub fn new(routing: Arc<RoutingTable>, use_threads: bool) -> Self {
        Self {
            routing,
            use_threads,
        }
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn resolve(&self, source: &str) -> Destination {
        if self.use_threads {
            self.routing.resolve(source)
        } else {
            self.routing.default_destination()
        }
    }
}

/// Convert a topic id to Telegram's thread id type.
pub fn telegram_thread(thread_id: i64) -> Result<ThreadId> {
    i32::try_from(thread_id)
        .map(|id| ThreadId(MessageId(id)))
        .map_err(|_| TelegramError::InvalidThread(thread_id))
}

/// [`Notifier`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    router: DeliveryRouter,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, router: DeliveryRouter) -> Self {
        Self { bot, router }
    }

    pub fn router(&self) -> &DeliveryRouter {
        &self.router
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn destination_for(&self, source: &str) -> Destination {
        self.router.resolve(source)
    }

    async fn send_text_to(&self, dest: Destination, text: &str) -> Result<()> {
        let mut req = self.bot.send_message(ChatId(dest.chat_id), text);
        if let Some(tid) = dest.thread_id {
            req = req.message_thread_id(telegram_thread(tid)?);
        }
        req.await?;
        debug!(chat_id = dest.chat_id, thread_id = ?dest.thread_id, "Text sent");
        Ok(())
    }

    async fn send_photo_to(
        &self,
        dest: Destination,
        photo: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        let size = photo.len();
        let file = InputFile::memory(photo).file_name("snapshot.jpg");
        let mut req = self
            .bot
            .send_photo(ChatId(dest.chat_id), file)
            .caption(caption);
        if let Some(tid) = dest.thread_id {
            req = req.message_thread_id(telegram_thread(tid)?);
        }
        req.await?;
        info!(chat_id = dest.chat_id, thread_id = ?dest.thread_id, size, "Photo sent");
        Ok(())
    }

    async fn send_video_to(
        &self,
        dest: Destination,
        video: Vec<u8>,
        caption: &str,
    ) -> Result<()> {
        let size = video.len();
        let file = InputFile::memory(video).file_name("clip.mp4");
        let mut req = self
            .bot
            .send_video(ChatId(dest.chat_id), file)
            .caption(caption);
        if let Some(tid) = dest.thread_id {
            req = req.message_thread_id(telegram_thread(tid)?);
        }
        req.await?;
        info!(chat_id = dest.chat_id, thread_id = ?dest.thread_id, size, "Video sent");
        Ok(())
    }
}
