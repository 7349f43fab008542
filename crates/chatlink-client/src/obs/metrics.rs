//! Minimal metrics registry for the client.
//!
//! Counter/gauge/histogram vectors with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors to keep deterministic
//! ordering. Histogram buckets are fixed in milliseconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Sorted rows so renders are stable across runs.
fn sorted_keys<V>(map: &DashMap<LabelKey, V>) -> Vec<LabelKey> {
    let mut keys: Vec<LabelKey> = map.iter().map(|r| r.key().clone()).collect();
    keys.sort();
    keys
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum across all label sets.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for key in sorted_keys(&self.map) {
            let val = self.map.get(&key).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0);
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(&key), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for key in sorted_keys(&self.map) {
            let val = self.map.get(&key).map(|g| g.load(Ordering::Relaxed)).unwrap_or(0);
            let _ = writeln!(out, "{}{{{}}} {}", name, label_str(&key), val);
        }
    }
}

// 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const BUCKETS_MILLIS: [u64; 9] = [10, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 9],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration into cumulative millisecond buckets.
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self
            .map
            .entry(label_key(labels))
            .or_insert_with(AtomicHistogram::default);
        let millis = duration.as_millis() as u64;

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(millis, Ordering::Relaxed);
        for (i, &b) in BUCKETS_MILLIS.iter().enumerate() {
            if millis <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} histogram", name);
        for key in sorted_keys(&self.map) {
            let Some(hist) = self.map.get(&key) else { continue };
            let labels = label_str(&key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (i, &le) in BUCKETS_MILLIS.iter().enumerate() {
                let count = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, le, count);
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, count);
            let sum = hist.sum.load(Ordering::Relaxed);
            let _ = writeln!(out, "{}_sum{{{}}} {}", name, labels, sum);
            let _ = writeln!(out, "{}_count{{{}}} {}", name, labels, count);
        }
    }
}

#[derive(Default)]
pub struct ClientMetrics {
    pub connect_attempts: CounterVec,
    /// Labels: `outcome` = opened | failed.
    pub connect_outcomes: CounterVec,
    pub connect_duration: HistogramVec, // milliseconds
    pub reconnects_scheduled: CounterVec,
    pub gave_up: CounterVec,
    /// Labels: `type` = text | typing | system | error.
    pub frames_in: CounterVec,
    pub frames_out: CounterVec,
    pub decode_errors: CounterVec,
    /// Labels: `reason` = not_connected | buffer | encode.
    pub sends_rejected: CounterVec,
    /// Labels: `state`; exactly one state carries 1.
    pub connection_state: GaugeVec,
}

impl ClientMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, current: &str) {
        for s in ["disconnected", "connecting", "connected"] {
            self.connection_state
                .set(&[("state", s)], i64::from(s == current));
        }
    }

    /// Render all registered metrics plus any extra lines provided by callers.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.connect_attempts.render("chatlink_connect_attempts_total", &mut out);
        self.connect_outcomes.render("chatlink_connect_outcomes_total", &mut out);
        self.connect_duration.render("chatlink_connect_duration_millis", &mut out);
        self.reconnects_scheduled.render("chatlink_reconnects_scheduled_total", &mut out);
        self.gave_up.render("chatlink_retries_exhausted_total", &mut out);
        self.frames_in.render("chatlink_frames_in_total", &mut out);
        self.frames_out.render("chatlink_frames_out_total", &mut out);
        self.decode_errors.render("chatlink_decode_errors_total", &mut out);
        self.sends_rejected.render("chatlink_sends_rejected_total", &mut out);
        self.connection_state.render("chatlink_connection_state", &mut out);
        for (k, v) in extra {
            let _ = writeln!(out, "{} {}", k, v);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_order_does_not_matter() {
        let c = CounterVec::default();
        c.inc(&[("a", "1"), ("b", "2")]);
        c.inc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 2);
        assert_eq!(c.total(), 2);
    }

    #[test]
    fn state_gauge_is_one_hot() {
        let m = ClientMetrics::new();
        m.set_state("connecting");
        m.set_state("connected");
        assert_eq!(m.connection_state.get(&[("state", "connected")]), 1);
        assert_eq!(m.connection_state.get(&[("state", "connecting")]), 0);
    }

    #[test]
    fn render_is_prometheus_text() {
        let m = ClientMetrics::new();
        m.frames_in.inc(&[("type", "text")]);
        m.connect_duration.observe(&[], Duration::from_millis(75));
        let out = m.render(&[("chatlink_event_log_len", 3)]);
        assert!(out.contains("chatlink_frames_in_total{type=\"text\"} 1"));
        assert!(out.contains("chatlink_connect_duration_millis_bucket{le=\"100\"} 1"));
        assert!(out.contains("chatlink_connect_duration_millis_bucket{le=\"50\"} 0"));
        assert!(out.contains("chatlink_event_log_len 3"));
    }
}
