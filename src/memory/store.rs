//! Conversation history storage
//!
//! Bounded, ordered, append-only log of turns. Eviction is FIFO once the
//! configured limit is reached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Default number of turns kept in memory
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Role of a turn's speaker
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single message in the conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Turn {
    id: Uuid,
    role: TurnRole,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Conversation history with a hard length limit
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    /// VecDeque for cheap head eviction
    turns: VecDeque<Turn>,
    limit: usize,
}

impl ConversationHistory {
    /// Create an empty history. A limit of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            turns: VecDeque::with_capacity(limit.min(DEFAULT_HISTORY_LIMIT)),
            limit,
        }
    }

    /// Add a turn to the tail, evicting from the head past the limit.
    ///
    /// A timestamp older than the current tail is clamped to the tail's,
    /// so timestamps never decrease in append order.
    pub fn append(&mut self, turn: Turn) {
        self.push(turn);
    }

    /// Append and hand back a copy of the turn as stored
    fn push(&mut self, mut turn: Turn) -> Turn {
        if let Some(last) = self.turns.back() {
            if turn.timestamp < last.timestamp {
                turn.timestamp = last.timestamp;
            }
        }

        let stored = turn.clone();
        self.turns.push_back(turn);

        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }

        stored
    }

    /// Independent copy, oldest first
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    /// Most recent turn spoken by `role`
    pub fn latest_by_role(&self, role: TurnRole) -> Option<&Turn> {
        self.turns.iter().rev().find(|t| t.role == role)
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

/// Process-wide conversation memory.
///
/// Created once at startup and handed to the orchestrator by handle. Every
/// mutation goes through the mutex, so concurrent requests never lose or
/// reorder appends.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    history: Arc<Mutex<ConversationHistory>>,
}

impl ConversationMemory {
    pub fn new(limit: usize) -> Self {
        Self {
            history: Arc::new(Mutex::new(ConversationHistory::new(limit))),
        }
    }

    /// Create a turn and append it while holding the lock
    pub async fn record(&self, role: TurnRole, content: impl Into<String>) -> Turn {
        let mut history = self.history.lock().await;
        history.push(Turn::new(role, content))
    }

    pub async fn append(&self, turn: Turn) {
        self.history.lock().await.append(turn);
    }

    pub async fn snapshot(&self) -> Vec<Turn> {
        self.history.lock().await.snapshot()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
