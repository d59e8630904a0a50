use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::agent::{AgentEvent, Explorer};
use crate::error::AgentError;
use crate::memory::{Checkpoint, ConversationStore};

/// Outcome of one question asked through an [`ExplorerSession`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReply {
    pub thread_id: String,
    pub answer: String,
    pub events: Vec<AgentEvent>,
    pub checkpoint: Checkpoint,
}

/// An explorer bound to a conversation store.
#[derive(Debug, Clone)]
pub struct ExplorerSession {
    explorer: Explorer,
    store: Arc<ConversationStore>,
}

impl ExplorerSession {
    #[must_use]
    pub fn new(explorer: Explorer, store: Arc<ConversationStore>) -> Self {
        Self { explorer, store }
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[must_use]
    pub const fn explorer(&self) -> &Explorer {
        &self.explorer
    }

    /// Runs `query` with the thread's history. A completed run is appended to
    /// the thread and checkpointed; a failed run leaves the thread untouched.
    ///
    /// # Errors
    /// Propagates any [`AgentError`] from the run.
    pub async fn ask<F>(&self, thread_id: &str, query: &str, on_event: F) -> Result<SessionReply, AgentError>
    where
        F: FnMut(&AgentEvent) + Send,
    {
        let history = self.store.messages(thread_id).await;
        let run = self.explorer.run(&history, query, on_event).await?;
        self.store.append(thread_id, run.messages).await;
        let checkpoint = self.store.checkpoint(thread_id).await;
        info!(thread_id, steps = run.steps, messages = checkpoint.message_count, "thread updated");
        Ok(SessionReply {
            thread_id: thread_id.to_string(),
            answer: run.answer,
            events: run.events,
            checkpoint,
        })
    }
}
