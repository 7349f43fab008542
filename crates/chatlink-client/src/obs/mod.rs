//! Lightweight in-process metrics.
//!
//! Labelled counters, gauges and histograms live in `DashMap`s of atomics
//! and render to Prometheus text so the probe (or a host application) can
//! dump connection health on demand.

pub mod metrics;

pub use metrics::ClientMetrics;
