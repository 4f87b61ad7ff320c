//! Main bot loop: pulls events off the channel and runs one turn per event.

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{Channel, IncomingMessage};
use crate::conversation::Conversations;
use crate::error::Error;

/// Wires a channel to the conversation engine.
///
/// Every event is handed to its own task; `Conversations` bounds how many
/// turns actually run at once.
pub struct Bot {
    channel: Arc<dyn Channel>,
    conversations: Arc<Conversations>,
}

impl Bot {
    pub fn new(channel: Arc<dyn Channel>, conversations: Arc<Conversations>) -> Self {
        Self {
            channel,
            conversations,
        }
    }

    /// Run until Ctrl+C or until the channel stream ends.
    pub async fn run(self) -> Result<(), Error> {
        let mut events = self.channel.start().await?;
        tracing::info!(channel = self.channel.name(), "Bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = events.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let channel = Arc::clone(&self.channel);
            let conversations = Arc::clone(&self.conversations);
            tokio::spawn(async move {
                handle_turn(&conversations, channel.as_ref(), &message).await;
            });
        }

        if let Err(e) = self.channel.shutdown().await {
            tracing::warn!("Channel shutdown failed: {e}");
        }
        Ok(())
    }
}

async fn handle_turn(conversations: &Conversations, channel: &dyn Channel, message: &IncomingMessage) {
    match conversations.process(message, channel).await {
        Ok(stage) => tracing::debug!(user_id = %message.user_id, %stage, "Turn complete"),
        Err(e) => tracing::error!(user_id = %message.user_id, "Turn failed: {e}"),
    }
}
