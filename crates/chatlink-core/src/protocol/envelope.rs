//! Envelope model (JSON text frames).
//!
//! Wire shape:
//! `{ "role": "...", "type": "...", "content": "...", "metadata": {...}, "timestamp": "RFC 3339" }`
//!
//! Inbound parsing is tolerant of what the backend omits (`role`, `metadata`,
//! `timestamp`) and of unknown extra fields. Outbound encoding always emits a
//! timestamp.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ChatLinkError, ErrorCode, Result};
use crate::protocol::report::{self, Report};
use crate::protocol::typing;

/// Max characters of a rejected payload kept in a synthetic error envelope.
const RAW_EXCERPT_CHARS: usize = 512;

/// Who produced the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// How a consumer should treat the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MsgType {
    Text,
    Typing,
    System,
    Error,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl MsgType {
    pub fn as_str(self) -> &'static str {
        match self {
            MsgType::Text => "text",
            MsgType::Typing => "typing",
            MsgType::System => "system",
            MsgType::Error => "error",
        }
    }

    fn default_role(self) -> Role {
        match self {
            MsgType::Text | MsgType::Typing => Role::Assistant,
            MsgType::System | MsgType::Error => Role::System,
        }
    }
}

/// One message unit. Immutable once handed to the event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub role: Role,
    /// Message type (field name is `type` in JSON).
    #[serde(rename = "type")]
    pub kind: MsgType,
    pub content: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    /// Canonical typing flag, folded from the backend's metadata keys.
    #[serde(skip)]
    pub typing: Option<bool>,
}

/// Inbound shape before normalization.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    #[serde(default)]
    role: Option<Role>,
    #[serde(rename = "type")]
    kind: MsgType,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
}

impl Envelope {
    /// Outbound user message stamped with the current time.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            kind: MsgType::Text,
            content: text.into(),
            metadata: Map::new(),
            timestamp: Utc::now(),
            typing: None,
        }
    }

    /// Serialize to the wire JSON shape.
    pub fn to_wire(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ChatLinkError::Encode(format!("envelope json: {e}")))
    }

    /// Parse one inbound text frame.
    pub fn decode(raw: &str) -> Result<Self> {
        Self::decode_at(raw, Utc::now())
    }

    /// Parse with an explicit receipt time (used for missing timestamps).
    pub fn decode_at(raw: &str, received_at: DateTime<Utc>) -> Result<Self> {
        let wire: WireEnvelope = serde_json::from_str(raw)
            .map_err(|e| ChatLinkError::Decode(format!("invalid envelope json: {e}")))?;

        let metadata = match wire.metadata {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m,
            Some(other) => {
                return Err(ChatLinkError::Decode(format!(
                    "metadata must be an object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let content = match wire.content {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
        };

        let timestamp = wire
            .timestamp
            .as_ref()
            .and_then(parse_timestamp)
            .unwrap_or(received_at);

        let typing = if wire.kind == MsgType::Typing {
            typing::resolve(&typing::effective_metadata(&content, &metadata))
        } else {
            typing::resolve(&metadata)
        };

        Ok(Self {
            role: wire.role.unwrap_or_else(|| wire.kind.default_role()),
            kind: wire.kind,
            content,
            metadata,
            timestamp,
            typing,
        })
    }

    /// Parse that never fails: malformed input becomes a synthetic
    /// `system`/`error` envelope carrying the reason and a raw excerpt.
    pub fn decode_lenient(raw: &str) -> Self {
        let received_at = Utc::now();
        match Self::decode_at(raw, received_at) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(error = %e, "inbound payload rejected");
                Self::decode_failure(raw, &e, received_at)
            }
        }
    }

    /// Synthetic envelope describing a payload that could not be decoded.
    pub fn decode_failure(raw: &str, err: &ChatLinkError, received_at: DateTime<Utc>) -> Self {
        let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
        let mut metadata = Map::new();
        metadata.insert("code".into(), Value::from(ErrorCode::DecodeFailed.as_str()));
        metadata.insert("raw".into(), Value::from(excerpt));
        Self {
            role: Role::System,
            kind: MsgType::Error,
            content: format!("malformed payload: {err}"),
            metadata,
            timestamp: received_at,
            typing: None,
        }
    }

    /// Typing envelopes are state signals, not conversation turns.
    pub fn is_displayable(&self) -> bool {
        self.kind != MsgType::Typing
    }

    /// Long-form assistant reply suitable for the preview panel.
    pub fn report(&self) -> Option<Report> {
        if self.role != Role::Assistant || self.kind != MsgType::Text {
            return None;
        }
        report::looks_like_report(&self.content).then(|| Report {
            body: self.content.clone(),
            received_at: self.timestamp,
        })
    }
}

fn parse_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        // epoch milliseconds
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
