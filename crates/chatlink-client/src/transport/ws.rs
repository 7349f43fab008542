//! WebSocket connector (tokio-tungstenite).
//!
//! One pump task per link:
//! - outbound channel -> socket writer
//! - socket reader -> inbound channel
//! - ping answered with pong, close/error end the inbound channel

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use chatlink_core::error::{ChatLinkError, Result};

use crate::transport::{Connector, Frame, Link};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsConnector {
    buffer: usize,
}

impl WsConnector {
    /// Also installs the process-wide rustls crypto provider (ring) that
    /// `wss://` endpoints need; an already installed provider is kept.
    pub fn new(buffer: usize) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self {
            buffer: buffer.max(1),
        }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Link> {
        let (socket, _resp) = connect_async(endpoint)
            .await
            .map_err(|e| ChatLinkError::Transport(format!("connect {endpoint}: {e}")))?;

        let (out_tx, out_rx) = mpsc::channel::<Frame>(self.buffer);
        let (in_tx, in_rx) = mpsc::channel::<Frame>(self.buffer);

        let endpoint = endpoint.to_owned();
        tokio::spawn(async move {
            pump(socket, out_rx, in_tx, &endpoint).await;
            tracing::debug!(%endpoint, "link pump finished");
        });

        Ok(Link {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

async fn pump(
    socket: Socket,
    mut out_rx: mpsc::Receiver<Frame>,
    in_tx: mpsc::Sender<Frame>,
    endpoint: &str,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            // outbound writer
            maybe_out = out_rx.recv() => {
                let msg = match maybe_out {
                    Some(Frame::Text(s)) => Message::text(s),
                    Some(Frame::Binary(b)) => Message::Binary(b),
                    Some(Frame::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    Some(Frame::Fault(_)) => continue,
                };
                if let Err(e) = ws_tx.send(msg).await {
                    tracing::warn!(%endpoint, error = %e, "socket write failed");
                    let _ = in_tx.send(Frame::Fault(format!("write failed: {e}"))).await;
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next() => {
                let frame = match incoming {
                    None => Frame::Close,
                    Some(Err(e)) => {
                        tracing::warn!(%endpoint, error = %e, "socket read failed");
                        Frame::Fault(format!("read failed: {e}"))
                    }
                    Some(Ok(Message::Text(t))) => Frame::Text(t.as_str().to_owned()),
                    Some(Ok(Message::Binary(b))) => Frame::Binary(b),
                    Some(Ok(Message::Ping(p))) => {
                        let _ = ws_tx.send(Message::Pong(p)).await;
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => continue,
                    Some(Ok(Message::Close(reason))) => {
                        tracing::info!(%endpoint, ?reason, "remote closed");
                        Frame::Close
                    }
                };
                let terminal = matches!(frame, Frame::Close | Frame::Fault(_));
                if in_tx.send(frame).await.is_err() || terminal {
                    break;
                }
            }
        }
    }
}
