//! Chat session: context + store + connection manager.
//!
//! The manager never talks to the store. This type does, on behalf of a UI:
//! it loads history on conversation switch, persists outgoing user messages
//! once they were handed to the socket, and persists assistant replies.

use std::sync::Arc;

use chatlink_core::error::{ChatLinkError, Result};
use chatlink_core::protocol::{Envelope, MsgType, Role};

use crate::conversation::context::SessionContext;
use crate::conversation::store::{Author, MessageStore, NewMessage, StoredMessage};
use crate::session::ConnectionManager;

pub struct ChatSession {
    ctx: SessionContext,
    store: Arc<dyn MessageStore>,
    manager: ConnectionManager,
}

impl ChatSession {
    pub fn new(
        ctx: SessionContext,
        store: Arc<dyn MessageStore>,
        manager: ConnectionManager,
    ) -> Self {
        Self { ctx, store, manager }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Switch conversations: clears the live event log and returns the
    /// stored history of `id`.
    pub async fn open_conversation(&mut self, id: &str) -> Result<Vec<StoredMessage>> {
        self.ctx.conversation_id = Some(id.to_owned());
        self.manager.clear_events();
        let history = self.store.list(id).await?;
        tracing::info!(conversation = id, messages = history.len(), "conversation opened");
        Ok(history)
    }

    /// Send `text` over the connection and persist it as a user message.
    pub async fn send(&self, text: &str) -> Result<StoredMessage> {
        if text.trim().is_empty() {
            return Err(ChatLinkError::BadRequest("message is empty".into()));
        }
        let conversation_id = self
            .ctx
            .conversation_id
            .clone()
            .ok_or(ChatLinkError::NoConversation)?;
        let user_id = self.ctx.user_id.clone().ok_or(ChatLinkError::NoUser)?;

        if !self.manager.send(text) {
            return Err(ChatLinkError::NotConnected);
        }

        self.store
            .create(NewMessage {
                conversation_id,
                author: Author::User { user_id },
                content: text.to_owned(),
            })
            .await
    }

    /// Persist an assistant text reply into the current conversation.
    /// Anything else (typing, notices, errors, no conversation) is skipped.
    pub async fn record_reply(&self, env: &Envelope) -> Result<Option<StoredMessage>> {
        if env.role != Role::Assistant || env.kind != MsgType::Text {
            return Ok(None);
        }
        let Some(conversation_id) = self.ctx.conversation_id.clone() else {
            return Ok(None);
        };
        let stored = self
            .store
            .create(NewMessage {
                conversation_id,
                author: Author::Agent {
                    agent_id: self.ctx.agent_id.clone(),
                },
                content: env.content.clone(),
            })
            .await?;
        Ok(Some(stored))
    }
}
