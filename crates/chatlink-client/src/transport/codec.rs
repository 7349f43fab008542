//! Decode-once codec: inbound frame -> envelope.
//!
//! - Text frames => lenient envelope decode
//! - Binary frames => UTF-8 check, then lenient decode
//! - Close/Fault are lifecycle signals and yield no envelope

use chrono::Utc;

use chatlink_core::error::ChatLinkError;
use chatlink_core::protocol::Envelope;

use crate::transport::Frame;

pub fn inbound_envelope(frame: Frame) -> Option<Envelope> {
    match frame {
        Frame::Text(s) => Some(Envelope::decode_lenient(&s)),
        Frame::Binary(b) => match std::str::from_utf8(&b) {
            Ok(s) => Some(Envelope::decode_lenient(s)),
            Err(e) => Some(Envelope::decode_failure(
                &format!("<binary frame, {} bytes>", b.len()),
                &ChatLinkError::Decode(format!("binary frame is not utf-8: {e}")),
                Utc::now(),
            )),
        },
        Frame::Close | Frame::Fault(_) => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chatlink_core::protocol::MsgType;

    #[test]
    fn text_and_utf8_binary_decode_alike() {
        let raw = r#"{"type":"text","content":"hi"}"#;
        let a = inbound_envelope(Frame::Text(raw.into())).unwrap();
        let b = inbound_envelope(Frame::Binary(Bytes::from_static(raw.as_bytes()))).unwrap();
        assert_eq!(a.content, b.content);
        assert_eq!(a.kind, MsgType::Text);
    }

    #[test]
    fn invalid_utf8_becomes_error_envelope() {
        let env = inbound_envelope(Frame::Binary(Bytes::from_static(&[0xff, 0xfe]))).unwrap();
        assert_eq!(env.kind, MsgType::Error);
        assert_eq!(env.metadata["raw"], "<binary frame, 2 bytes>");
    }

    #[test]
    fn lifecycle_frames_yield_nothing() {
        assert!(inbound_envelope(Frame::Close).is_none());
        assert!(inbound_envelope(Frame::Fault("reset".into())).is_none());
    }
}
