//! Transport layer (WebSocket client).
//!
//! The manager only sees `Connector` and `Link`; `WsConnector` is the
//! production implementation and tests substitute a scripted one.

pub mod codec;
pub mod ws;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use chatlink_core::error::Result;

pub use ws::WsConnector;

/// Unit exchanged between the manager and a live link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
    /// Outbound: close request. Inbound: orderly remote close.
    Close,
    /// Inbound only: the link broke.
    Fault(String),
}

/// One open duplex connection. Dropping `outbound` closes it.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<Frame>,
    pub inbound: mpsc::Receiver<Frame>,
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a connection. Resolves once the handshake completed.
    async fn connect(&self, endpoint: &str) -> Result<Link>;
}
