//! Shared error type across chatlink crates.

use thiserror::Error;

/// Stable error codes (surfaced in synthetic envelopes and logs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Configuration rejected.
    BadConfig,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Caller supplied invalid input.
    BadRequest,
    /// Inbound payload could not be decoded.
    DecodeFailed,
    /// Outbound envelope could not be encoded.
    EncodeFailed,
    /// Network / socket level failure.
    Transport,
    /// Operation requires a live connection.
    NotConnected,
    /// No conversation selected.
    NoConversation,
    /// No signed-in user in the session context.
    NoUser,
    /// Message store failure.
    Store,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in envelope metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadConfig => "BAD_CONFIG",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::DecodeFailed => "DECODE_FAILED",
            ErrorCode::EncodeFailed => "ENCODE_FAILED",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::NotConnected => "NOT_CONNECTED",
            ErrorCode::NoConversation => "NO_CONVERSATION",
            ErrorCode::NoUser => "NO_USER",
            ErrorCode::Store => "STORE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ChatLinkError>;

/// Unified error type used by core and client.
#[derive(Debug, Clone, Error)]
pub enum ChatLinkError {
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("not connected")]
    NotConnected,
    #[error("no conversation selected")]
    NoConversation,
    #[error("no user in session context")]
    NoUser,
    #[error("store: {0}")]
    Store(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ChatLinkError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatLinkError::BadConfig(_) => ErrorCode::BadConfig,
            ChatLinkError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            ChatLinkError::BadRequest(_) => ErrorCode::BadRequest,
            ChatLinkError::Decode(_) => ErrorCode::DecodeFailed,
            ChatLinkError::Encode(_) => ErrorCode::EncodeFailed,
            ChatLinkError::Transport(_) => ErrorCode::Transport,
            ChatLinkError::NotConnected => ErrorCode::NotConnected,
            ChatLinkError::NoConversation => ErrorCode::NoConversation,
            ChatLinkError::NoUser => ErrorCode::NoUser,
            ChatLinkError::Store(_) => ErrorCode::Store,
            ChatLinkError::Internal(_) => ErrorCode::Internal,
        }
    }
}
