//! chatlink client library entry.
//!
//! This crate wires the transport, session machine, connection manager and
//! conversation layer into one client stack. It is consumed by the probe
//! binary (`main.rs`), by integration tests, and by host applications.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod conversation;
pub mod obs;
pub mod session;
pub mod transport;

pub use session::{ConnState, ConnectionManager, Observer, SubscriptionId};
