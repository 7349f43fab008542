//! Long-form report detection.
//!
//! Assistant replies that carry Markdown structure or run long are rendered
//! in a separate preview panel rather than inline.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Replies longer than this are always treated as reports.
pub const LONG_REPLY_CHARS: usize = 300;

static MARKDOWN_HINT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)```|^#{1,6}\s|^\s*[-*]\s|\*\*|\n\n").ok());

/// Report body captured from an assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub body: String,
    pub received_at: DateTime<Utc>,
}

pub fn looks_like_report(content: &str) -> bool {
    if content.chars().count() > LONG_REPLY_CHARS {
        return true;
    }
    MARKDOWN_HINT
        .as_ref()
        .map(|re| re.is_match(content))
        .unwrap_or(false)
}
