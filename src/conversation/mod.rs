//! Conversation state machine with per-user serialized sessions.

pub mod input;
pub mod machine;
pub mod prompts;
pub mod state;
pub mod store;

pub use input::Input;
pub use machine::{Action, Clock, ConversationEngine, transition};
pub use state::{Session, Stage};
pub use store::{InMemorySessionStore, SessionStore};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tracing::{Instrument, error, info_span, warn};

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::error::ExtractionError;

/// Default bound on turns running at once, across all users.
pub const DEFAULT_MAX_CONCURRENT_TURNS: usize = 32;

/// Routes inbound events to sessions, one turn at a time per user.
///
/// Turns for different users run concurrently; turns for the same user are
/// serialized by a per-user lock held from session load to session store,
/// including delivery of the replies. A turn permit is taken only once the
/// user's lock is held, so a user's queued events never occupy permits.
pub struct Conversations {
    engine: ConversationEngine,
    store: Arc<dyn SessionStore>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    turn_permits: Semaphore,
}

impl Conversations {
    pub fn new(engine: ConversationEngine, store: Arc<dyn SessionStore>) -> Self {
        Self {
            engine,
            store,
            locks: Mutex::new(HashMap::new()),
            turn_permits: Semaphore::new(DEFAULT_MAX_CONCURRENT_TURNS),
        }
    }

    pub fn with_max_concurrent_turns(mut self, max: usize) -> Self {
        self.turn_permits = Semaphore::new(max.max(1));
        self
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the user's lock entry when no other turn holds or awaits it.
    async fn release_user_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
        drop(lock);
    }

    /// Current stage for `user_id` (Start if unknown).
    pub async fn stage_of(&self, user_id: &str) -> Stage {
        self.store
            .get(user_id)
            .await
            .map(|s| s.stage)
            .unwrap_or_default()
    }

    /// Handle one inbound event and deliver its replies through `channel`.
    ///
    /// Returns the stage the user ends in. An extraction failure leaves the
    /// session as it was and sends the user a notice before the error is
    /// returned.
    pub async fn process(
        &self,
        msg: &IncomingMessage,
        channel: &dyn Channel,
    ) -> Result<Stage, ExtractionError> {
        let span = info_span!(
            "turn",
            channel = %msg.channel,
            user_id = %msg.user_id,
            user_name = ?msg.user_name,
            event_id = %msg.id
        );
        self.process_inner(msg, channel).instrument(span).await
    }

    async fn process_inner(
        &self,
        msg: &IncomingMessage,
        channel: &dyn Channel,
    ) -> Result<Stage, ExtractionError> {
        let lock = self.user_lock(&msg.user_id).await;
        let result = {
            let _guard = lock.lock().await;
            // The semaphore is never closed.
            let _permit = self.turn_permits.acquire().await.ok();
            self.run_turn(msg, channel).await
        };
        self.release_user_lock(&msg.user_id, lock).await;
        result
    }

    async fn run_turn(
        &self,
        msg: &IncomingMessage,
        channel: &dyn Channel,
    ) -> Result<Stage, ExtractionError> {
        let mut session = self.store.get(&msg.user_id).await.unwrap_or_default();
        let input = Input::classify(msg);

        match self.engine.step(&mut session, &input).await {
            Ok(replies) => {
                for reply in replies {
                    deliver(channel, msg, reply).await;
                }
                let stage = session.stage;
                self.store.put(&msg.user_id, session).await;
                Ok(stage)
            }
            Err(e) => {
                error!(error = %e, stage = %session.stage, "Document extraction failed");
                let notice = self.engine.failure_notice().await;
                deliver(channel, msg, OutgoingResponse::text(notice)).await;
                Err(e)
            }
        }
    }
}

async fn deliver(channel: &dyn Channel, msg: &IncomingMessage, reply: OutgoingResponse) {
    if let Err(e) = channel.respond(msg, reply).await {
        warn!(channel = channel.name(), error = %e, "Failed to deliver reply");
    }
}
