//! Typing-indicator flag normalization.
//!
//! The backend has shipped the flag under two spellings (`is_typing` and
//! `isTyping`) and sometimes double-encodes it inside a JSON `content`
//! string. Everything downstream reads `Envelope::typing` instead.
//!
//! Neither spelling is treated as authoritative: when both are present and
//! disagree the flag resolves to `true` if either says so, and the conflict
//! is logged so the upstream contract can be fixed.

use serde_json::{Map, Value};

pub const SNAKE_KEY: &str = "is_typing";
pub const CAMEL_KEY: &str = "isTyping";

/// Which spelling(s) of the flag a metadata map carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingKey {
    Absent,
    Snake,
    Camel,
    Both,
}

/// Report which typing keys are present (diagnostics).
pub fn inspect(metadata: &Map<String, Value>) -> TypingKey {
    match (metadata.contains_key(SNAKE_KEY), metadata.contains_key(CAMEL_KEY)) {
        (false, false) => TypingKey::Absent,
        (true, false) => TypingKey::Snake,
        (false, true) => TypingKey::Camel,
        (true, true) => TypingKey::Both,
    }
}

/// Fold both spellings into one flag. `None` when no usable flag exists.
pub fn resolve(metadata: &Map<String, Value>) -> Option<bool> {
    let snake = flag(metadata, SNAKE_KEY);
    let camel = flag(metadata, CAMEL_KEY);
    match (snake, camel) {
        (None, None) => None,
        (Some(v), None) | (None, Some(v)) => Some(v),
        (Some(a), Some(b)) => {
            if a != b {
                tracing::warn!(
                    is_typing = a,
                    isTyping = b,
                    "conflicting typing flag spellings in backend metadata"
                );
            }
            Some(a || b)
        }
    }
}

/// Metadata to read for a `typing` envelope: a JSON object in `content`
/// carrying its own `metadata` map takes precedence over the outer one.
pub fn effective_metadata(content: &str, outer: &Map<String, Value>) -> Map<String, Value> {
    let trimmed = content.trim_start();
    if !trimmed.starts_with('{') {
        return outer.clone();
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(mut inner)) => match inner.remove("metadata") {
            Some(Value::Object(m)) => m,
            _ => outer.clone(),
        },
        Ok(_) => outer.clone(),
        Err(e) => {
            tracing::debug!(error = %e, "typing content is not valid json");
            outer.clone()
        }
    }
}

fn flag(metadata: &Map<String, Value>, key: &str) -> Option<bool> {
    match metadata.get(key)? {
        Value::Bool(b) => Some(*b),
        other => {
            tracing::debug!(key, value = %other, "ignoring non-boolean typing flag");
            None
        }
    }
}
