//! Per-thread conversation memory.
//!
//! Threads live in memory for the lifetime of a store. Front ends that run
//! once per query persist the whole store to a JSON file between runs.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::AgentError;
use crate::message::{ChatMessage, Role};

/// Snapshot marker recorded after each completed exploration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub checkpoint_id: String,
    pub message_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Counts of a thread's messages by role plus a one-line description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub message_count: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    pub tool_messages: usize,
    pub last_query: Option<String>,
    pub text: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ThreadState {
    messages: Vec<ChatMessage>,
    checkpoints: Vec<Checkpoint>,
}

/// In-memory conversation store keyed by thread id.
#[derive(Debug, Default)]
pub struct ConversationStore {
    threads: RwLock<HashMap<String, ThreadState>>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a store written by [`ConversationStore::save`]. A missing file
    /// yields an empty store.
    ///
    /// # Errors
    /// Returns [`AgentError::Io`] when the file cannot be read and
    /// [`AgentError::Serialization`] when it is not a saved store.
    pub async fn load(path: &Path) -> Result<Self, AgentError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no conversation history yet");
                return Ok(Self::new());
            }
            Err(err) => return Err(err.into()),
        };
        let threads: HashMap<String, ThreadState> = serde_json::from_slice(&bytes)?;
        debug!(path = %path.display(), threads = threads.len(), "conversation history loaded");
        Ok(Self {
            threads: RwLock::new(threads),
        })
    }

    /// Writes every thread to `path` as JSON, replacing the file with a
    /// single rename.
    ///
    /// # Errors
    /// Returns [`AgentError::Io`] when the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), AgentError> {
        let bytes = serde_json::to_vec_pretty(&*self.threads.read().await)?;
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let staging = staging_path(path);
        let written = match fs::write(&staging, bytes).await {
            Ok(()) => fs::rename(&staging, path).await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            let _ = fs::remove_file(&staging).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Returns a copy of the thread's history; unknown threads are empty.
    pub async fn messages(&self, thread_id: &str) -> Vec<ChatMessage> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(|state| state.messages.clone())
            .unwrap_or_default()
    }

    pub async fn append(&self, thread_id: &str, messages: impl IntoIterator<Item = ChatMessage>) {
        self.threads
            .write()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .messages
            .extend(messages);
    }

    /// Drops a thread's messages and checkpoints. Returns whether it existed.
    pub async fn clear(&self, thread_id: &str) -> bool {
        self.threads.write().await.remove(thread_id).is_some()
    }

    pub async fn count(&self, thread_id: &str) -> usize {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map_or(0, |state| state.messages.len())
    }

    /// Records a checkpoint at the thread's current length.
    pub async fn checkpoint(&self, thread_id: &str) -> Checkpoint {
        let mut threads = self.threads.write().await;
        let state = threads.entry(thread_id.to_string()).or_default();
        let checkpoint = Checkpoint {
            checkpoint_id: Uuid::new_v4().to_string(),
            message_count: state.messages.len(),
            timestamp: Utc::now(),
        };
        state.checkpoints.push(checkpoint.clone());
        drop(threads);
        checkpoint
    }

    /// Checkpoints oldest first.
    pub async fn checkpoints(&self, thread_id: &str) -> Vec<Checkpoint> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(|state| state.checkpoints.clone())
            .unwrap_or_default()
    }

    /// The most recent `limit` checkpoints, oldest first.
    pub async fn recent_checkpoints(&self, thread_id: &str, limit: usize) -> Vec<Checkpoint> {
        let mut checkpoints = self.checkpoints(thread_id).await;
        let skip = checkpoints.len().saturating_sub(limit);
        checkpoints.drain(..skip);
        checkpoints
    }

    pub async fn summary(&self, thread_id: &str) -> ThreadSummary {
        summarize(&self.messages(thread_id).await)
    }

    /// Known thread ids, sorted.
    pub async fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn summarize(messages: &[ChatMessage]) -> ThreadSummary {
    let by_role = |role: Role| messages.iter().filter(|message| message.role == role).count();
    let user_messages = by_role(Role::User);
    let assistant_messages = by_role(Role::Assistant);
    let tool_messages = by_role(Role::Tool);
    let last_query = messages
        .iter()
        .rev()
        .find(|message| message.role == Role::User)
        .map(|message| message.text_content().to_string());

    let text = if messages.is_empty() {
        "No conversation history.".to_string()
    } else {
        let mut text = format!(
            "Conversation has {} messages ({user_messages} user, {assistant_messages} assistant, {tool_messages} tool).",
            messages.len()
        );
        if let Some(query) = &last_query {
            let _ = write!(text, " Last query: {query}");
        }
        text
    };

    ThreadSummary {
        message_count: messages.len(),
        user_messages,
        assistant_messages,
        tool_messages,
        last_query,
        text,
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staging = OsString::from(path.as_os_str());
    staging.push(".tmp");
    PathBuf::from(staging)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn threads_are_isolated_and_clearable() {
        let store = ConversationStore::new();
        store
            .append("a", [ChatMessage::user("temperature in Chicago"), ChatMessage::assistant("12C")])
            .await;
        store.append("b", [ChatMessage::user("ndvi")]).await;

        assert_eq!(store.count("a").await, 2);
        assert_eq!(store.count("b").await, 1);
        assert_eq!(store.thread_ids().await, vec!["a".to_string(), "b".to_string()]);

        assert!(store.clear("a").await);
        assert!(!store.clear("a").await);
        assert!(store.messages("a").await.is_empty());
        assert_eq!(store.count("b").await, 1);
    }

    #[tokio::test]
    async fn checkpoints_track_message_counts() {
        let store = ConversationStore::new();
        for turn in 0..7 {
            store.append("t", [ChatMessage::user(format!("q{turn}"))]).await;
            store.checkpoint("t").await;
        }
        let recent = store.recent_checkpoints("t", 5).await;
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].message_count, 3);
        assert_eq!(recent[4].message_count, 7);
        assert_ne!(recent[0].checkpoint_id, recent[1].checkpoint_id);
    }

    #[tokio::test]
    async fn summary_counts_roles() {
        let store = ConversationStore::new();
        assert_eq!(store.summary("empty").await.text, "No conversation history.");

        store
            .append("t", [ChatMessage::user("find NDVI"), ChatMessage::assistant("done")])
            .await;
        let summary = store.summary("t").await;
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.last_query.as_deref(), Some("find NDVI"));
        assert!(summary.text.starts_with("Conversation has 2 messages"));
    }

    #[tokio::test]
    async fn saved_threads_survive_a_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history").join("threads.json");

        let store = ConversationStore::new();
        store
            .append("cli", [ChatMessage::user("LST for Chicago"), ChatMessage::assistant("submitted")])
            .await;
        let checkpoint = store.checkpoint("cli").await;
        store.save(&path).await.expect("saved");
        assert!(!staging_path(&path).exists());

        let reloaded = ConversationStore::load(&path).await.expect("loaded");
        assert_eq!(reloaded.messages("cli").await, store.messages("cli").await);
        assert_eq!(reloaded.checkpoints("cli").await, vec![checkpoint]);

        reloaded.append("cli", [ChatMessage::user("and NDVI?")]).await;
        reloaded.save(&path).await.expect("saved again");
        let again = ConversationStore::load(&path).await.expect("loaded again");
        assert_eq!(again.count("cli").await, 3);
        assert_eq!(again.thread_ids().await, vec!["cli".to_string()]);
    }

    #[tokio::test]
    async fn missing_history_is_empty_and_garbage_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = ConversationStore::load(&dir.path().join("none.json")).await.expect("empty store");
        assert!(missing.thread_ids().await.is_empty());

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "not json").expect("write");
        let err = ConversationStore::load(&garbage).await.expect_err("not a saved store");
        assert!(matches!(err, AgentError::Serialization(_)));
    }
}
