//! Conversation layer: explicit session context, the message-store seam and
//! the `ChatSession` glue between store and connection manager.
//!
//! The persistence API is an external collaborator; only its interface and an
//! in-process implementation live here.

pub mod chat;
pub mod context;
pub mod store;

pub use chat::ChatSession;
pub use context::SessionContext;
pub use store::{Author, MemoryStore, MessageStore, NewMessage, StoredMessage};
