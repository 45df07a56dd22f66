//! Inbound command dispatcher.

use std::sync::Arc;

use relay_core::Destination;
use teloxide::dispatching::{HandlerExt, UpdateFilterExt};
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::commands::{unknown_command_reply, Command, CommandOrchestrator, Reply};
use crate::error::Result;
use crate::notifier::Notifier;

/// The Telegram side of the relay: answers chat commands.
pub struct RelayBot {
    bot: Bot,
    commands: Arc<CommandOrchestrator>,
    notifier: Arc<dyn Notifier>,
}

impl RelayBot {
    pub fn new(bot: Bot, commands: Arc<CommandOrchestrator>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            bot,
            commands,
            notifier,
        }
    }

    /// Run long polling until the dispatcher stops.
    pub async fn run(&self) -> Result<()> {
        info!("Starting Telegram command dispatcher");

        let commands = Arc::clone(&self.commands);
        let cmd_notifier = Arc::clone(&self.notifier);
        let unknown_notifier = Arc::clone(&self.notifier);

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(move |msg: Message, cmd: Command| {
                        let commands = Arc::clone(&commands);
                        let notifier = Arc::clone(&cmd_notifier);
                        info!(chat_id = %msg.chat.id, command = ?cmd, "Command received");
                        async move {
                            run_command(&commands, notifier.as_ref(), cmd, origin(&msg)).await;
                            respond(())
                        }
                    }),
            )
            .branch(
                Update::filter_message()
                    .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                    .endpoint(move |msg: Message| {
                        let notifier = Arc::clone(&unknown_notifier);
                        async move {
                            if let Some(text) = msg.text() {
                                info!(cmd = %text, "Unrecognized command");
                                let reply = unknown_command_reply(text);
                                if let Err(e) = notifier.send_text_to(origin(&msg), &reply).await {
                                    warn!(error = %e, "Failed to answer unknown command");
                                }
                            }
                            respond(())
                        }
                    }),
            );

        Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|_upd| async {})
            .build()
            .dispatch()
            .await;

        info!("Telegram command dispatcher stopped");
        Ok(())
    }
}

/// Chat and topic a message came from.
pub fn origin(msg: &Message) -> Destination {
    Destination {
        chat_id: msg.chat.id.0,
        thread_id: msg.thread_id.map(|tid| i64::from(tid.0 .0)),
    }
}

async fn run_command(
    commands: &CommandOrchestrator,
    notifier: &dyn Notifier,
    cmd: Command,
    origin: Destination,
) {
    match commands.handle(cmd, origin).await {
        Reply::Text(text) => {
            if let Err(e) = notifier.send_text_to(origin, &text).await {
                warn!(chat_id = origin.chat_id, error = %e, "Failed to send command reply");
            }
        }
        Reply::Sent => {}
        Reply::Restart(text) => {
            if let Err(e) = notifier.send_text_to(origin, &text).await {
                warn!(chat_id = origin.chat_id, error = %e, "Failed to send restart reply");
            }
            commands.request_shutdown();
        }
    }
}
