//! Protocol modules (envelope model + wire helpers).
//!
//! - `envelope`: the JSON message unit exchanged with the backend.
//! - `typing`: normalization of the typing-indicator metadata flag.
//! - `report`: detection of long-form analytical replies.
//!
//! All parsers are panic-free: malformed input is reported as `ChatLinkError`
//! or folded into a synthetic error envelope by `Envelope::decode_lenient`.

pub mod envelope;
pub mod report;
pub mod typing;

pub use envelope::{Envelope, MsgType, Role};
pub use report::Report;
