//! Per-session conversation memory with a sliding turn window.
//!
//! [`ConversationMemory`] keeps a bounded deque of turns per session.
//! Appending beyond capacity evicts from the oldest end, never the newest.
//! Access to a given session is serialized by a per-session mutex; different
//! sessions proceed fully in parallel and never interleave.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user asking questions.
    User,
    /// The assistant's generated answers.
    Assistant,
}

impl Role {
    /// The label used when rendering history into a prompt.
    fn prompt_label(self) -> &'static str {
        match self {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

/// One turn of a conversation, appended in strict chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced this turn.
    pub role: Role,
    /// The turn's text content.
    pub content: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Maximum characters of a single turn rendered into the history block.
const PER_TURN_CHAR_CAP: usize = 500;

/// Keyed per-session store of bounded conversation windows.
pub struct ConversationMemory {
    max_turns: usize,
    sessions: RwLock<HashMap<String, Arc<Mutex<VecDeque<ConversationTurn>>>>>,
}

impl ConversationMemory {
    /// Create a memory retaining at most `max_turns` user+assistant pairs
    /// per session.
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns, sessions: RwLock::new(HashMap::new()) }
    }

    /// Window capacity in individual turns (pairs × 2).
    fn capacity(&self) -> usize {
        self.max_turns * 2
    }

    /// Get or create the lock guarding one session's turns.
    async fn session(&self, session_id: &str) -> Arc<Mutex<VecDeque<ConversationTurn>>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(turns) = sessions.get(session_id) {
                return Arc::clone(turns);
            }
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(session_id.to_string()).or_default())
    }

    /// Append a single turn to a session, evicting the oldest turn if the
    /// window is full.
    pub async fn append(&self, session_id: &str, role: Role, content: impl Into<String>) {
        let session = self.session(session_id).await;
        let mut turns = session.lock().await;
        turns.push_back(ConversationTurn {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        while turns.len() > self.capacity() {
            turns.pop_front();
        }
    }

    /// Return a snapshot of a session's turns, oldest first.
    ///
    /// The snapshot is not live-linked to future appends.
    pub async fn recent(&self, session_id: &str) -> Vec<ConversationTurn> {
        let session = self.session(session_id).await;
        let turns = session.lock().await;
        turns.iter().cloned().collect()
    }

    /// Render a session's history for prompt injection.
    ///
    /// Each turn becomes a `Human:`/`Assistant:` line, chronological order,
    /// joined by newlines. Individual turns are capped at 500 characters;
    /// if the whole block exceeds `max_chars` it is truncated from the
    /// oldest end and prefixed with a truncation marker. Returns an empty
    /// string for a session with no turns.
    pub async fn format_history(&self, session_id: &str, max_chars: usize) -> String {
        let turns = self.recent(session_id).await;
        if turns.is_empty() {
            return String::new();
        }

        let lines: Vec<String> = turns
            .iter()
            .map(|turn| {
                format!(
                    "{}: {}",
                    turn.role.prompt_label(),
                    char_head(&turn.content, PER_TURN_CHAR_CAP)
                )
            })
            .collect();

        let block = lines.join("\n");
        if block.chars().count() > max_chars {
            format!("...[truncated]\n{}", char_tail(&block, max_chars))
        } else {
            block
        }
    }

    /// Remove all turns for a session.
    pub async fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        info!(session_id, "cleared conversation memory");
    }

    /// Number of sessions currently holding turns.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// First `n` characters of a string, respecting char boundaries.
fn char_head(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Last `n` characters of a string, respecting char boundaries.
fn char_tail(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    let byte_start = text.char_indices().nth(count - n).map_or(0, |(i, _)| i);
    &text[byte_start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sliding_window_keeps_most_recent() {
        let memory = ConversationMemory::new(2); // capacity: 4 turns
        for i in 0..5 {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            memory.append("s1", role, format!("turn {i}")).await;
        }

        let turns = memory.recent("s1").await;
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].content, "turn 1");
        assert_eq!(turns[3].content, "turn 4");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let memory = ConversationMemory::new(5);
        memory.append("alice", Role::User, "hello from alice").await;
        memory.append("bob", Role::User, "hello from bob").await;

        let alice = memory.recent("alice").await;
        let bob = memory.recent("bob").await;
        assert_eq!(alice.len(), 1);
        assert_eq!(bob.len(), 1);
        assert_eq!(alice[0].content, "hello from alice");
        assert_eq!(bob[0].content, "hello from bob");
    }

    #[tokio::test]
    async fn format_history_renders_role_labels() {
        let memory = ConversationMemory::new(5);
        memory.append("s1", Role::User, "What is RAG?").await;
        memory.append("s1", Role::Assistant, "Retrieval-augmented generation.").await;

        let block = memory.format_history("s1", 2000).await;
        assert_eq!(block, "Human: What is RAG?\nAssistant: Retrieval-augmented generation.");
    }

    #[tokio::test]
    async fn format_history_truncates_from_oldest_end() {
        let memory = ConversationMemory::new(10);
        memory.append("s1", Role::User, "a".repeat(100)).await;
        memory.append("s1", Role::Assistant, "b".repeat(100)).await;

        let block = memory.format_history("s1", 50).await;
        assert!(block.starts_with("...[truncated]\n"));
        // The newest content survives truncation
        assert!(block.ends_with('b'));
    }

    #[tokio::test]
    async fn format_history_empty_session() {
        let memory = ConversationMemory::new(5);
        assert_eq!(memory.format_history("nobody", 2000).await, "");
    }

    #[tokio::test]
    async fn clear_removes_all_turns() {
        let memory = ConversationMemory::new(5);
        memory.append("s1", Role::User, "hello").await;
        memory.clear("s1").await;
        assert!(memory.recent("s1").await.is_empty());
    }

    #[tokio::test]
    async fn session_count_tracks_sessions() {
        let memory = ConversationMemory::new(5);
        memory.append("s1", Role::User, "x").await;
        memory.append("s2", Role::User, "y").await;
        assert_eq!(memory.session_count().await, 2);
        memory.clear("s1").await;
        assert_eq!(memory.session_count().await, 1);
    }
}
