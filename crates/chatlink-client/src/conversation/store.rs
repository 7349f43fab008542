use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use chatlink_core::error::{ChatLinkError, Result};
use chatlink_core::protocol::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    User { user_id: String },
    Agent { agent_id: String },
}

impl Author {
    pub fn role(&self) -> Role {
        match self {
            Author::User { .. } => Role::User,
            Author::Agent { .. } => Role::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub author: Author,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: u64,
    pub conversation_id: String,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn role(&self) -> Role {
        self.author.role()
    }
}

/// Request/response persistence API for conversation history.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Messages of one conversation, oldest first.
    async fn list(&self, conversation_id: &str) -> Result<Vec<StoredMessage>>;
    async fn create(&self, msg: NewMessage) -> Result<StoredMessage>;
}

/// In-process store. Ids increase monotonically across conversations.
pub struct MemoryStore {
    conversations: DashMap<String, Vec<StoredMessage>>,
    seq: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            conversations: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn list(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        Ok(self
            .conversations
            .get(conversation_id)
            .map(|m| m.value().clone())
            .unwrap_or_default())
    }

    async fn create(&self, msg: NewMessage) -> Result<StoredMessage> {
        if msg.conversation_id.is_empty() {
            return Err(ChatLinkError::Store("conversation_id must not be empty".into()));
        }
        let stored = StoredMessage {
            id: self.seq.fetch_add(1, Ordering::Relaxed),
            conversation_id: msg.conversation_id,
            author: msg.author,
            content: msg.content,
            created_at: Utc::now(),
        };
        self.conversations
            .entry(stored.conversation_id.clone())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }
}
