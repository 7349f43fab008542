//! chatlink core: transport-agnostic envelope model, wire codec, and error types.
//!
//! This crate defines the message contract shared by the connection manager,
//! the conversation layer, and any UI that renders the event log. It carries
//! no transport or runtime dependencies so it can be reused in tests and tools.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed inbound payloads surface as `ChatLinkError` or as synthetic
//! error envelopes, never as a crash of the host process.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ChatLinkError, ErrorCode, Result};
pub use protocol::{Envelope, MsgType, Report, Role};
