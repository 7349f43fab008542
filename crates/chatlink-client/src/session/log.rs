//! Append-only event log and the separate typing track.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use chatlink_core::protocol::{Envelope, Report};

/// Ordered, append-only sequence of displayable envelopes.
///
/// Insertion order is receipt order. Entries are never removed or reordered;
/// `clear` exists only for an explicit caller action such as switching
/// conversations.
#[derive(Default)]
pub struct EventLog {
    entries: RwLock<Vec<Arc<Envelope>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, env: Arc<Envelope>) -> usize {
        let mut g = self.entries.write().unwrap_or_else(|p| p.into_inner());
        g.push(env);
        g.len()
    }

    pub fn snapshot(&self) -> Vec<Arc<Envelope>> {
        self.entries
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

/// Current typing indicator of the remote agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingState {
    pub active: bool,
    pub changed_at: DateTime<Utc>,
}

/// Typing signals, kept out of the event log so they never render as turns.
pub struct TypingTrack {
    current: RwLock<TypingState>,
}

impl Default for TypingTrack {
    fn default() -> Self {
        Self {
            current: RwLock::new(TypingState {
                active: false,
                changed_at: Utc::now(),
            }),
        }
    }
}

impl TypingTrack {
    pub fn get(&self) -> TypingState {
        *self.current.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Record a flag; returns the new state only when it changed.
    pub fn set(&self, active: bool, at: DateTime<Utc>) -> Option<TypingState> {
        let mut g = self.current.write().unwrap_or_else(|p| p.into_inner());
        if g.active == active {
            return None;
        }
        *g = TypingState {
            active,
            changed_at: at,
        };
        Some(*g)
    }
}

/// Latest report-style reply, for a preview panel.
#[derive(Default)]
pub struct ReportSlot {
    latest: RwLock<Option<Report>>,
}

impl ReportSlot {
    pub fn get(&self) -> Option<Report> {
        self.latest.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set(&self, report: Report) {
        *self.latest.write().unwrap_or_else(|p| p.into_inner()) = Some(report);
    }

    pub fn clear(&self) {
        *self.latest.write().unwrap_or_else(|p| p.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_preserves_append_order() {
        let log = EventLog::new();
        for i in 0..5 {
            log.append(Arc::new(Envelope::user_text(format!("m{i}"))));
        }
        let contents: Vec<String> = log.snapshot().iter().map(|e| e.content.clone()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn typing_track_reports_changes_only() {
        let t = TypingTrack::default();
        let now = Utc::now();
        assert!(t.set(false, now).is_none());
        assert_eq!(t.set(true, now).map(|s| s.active), Some(true));
        assert!(t.set(true, now).is_none());
        assert!(t.get().active);
    }
}
