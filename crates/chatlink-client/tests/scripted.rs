//! Scripted in-memory connector and recording observer shared by the
//! manager and chat-session tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use chatlink_client::config::ClientSection;
use chatlink_client::session::{ConnState, Observer, TypingState};
use chatlink_client::transport::{Connector, Frame, Link};
use chatlink_core::error::{ChatLinkError, Result};
use chatlink_core::protocol::Envelope;

/// Server side of one accepted link.
pub struct Peer {
    pub to_client: mpsc::Sender<Frame>,
    pub from_client: mpsc::Receiver<Frame>,
}

impl Peer {
    pub async fn push(&self, raw: &str) {
        self.to_client.send(Frame::Text(raw.to_owned())).await.unwrap();
    }

    /// Everything the client wrote so far, plus whether its writer is gone.
    pub fn drain(&mut self) -> (Vec<Frame>, bool) {
        let mut frames = Vec::new();
        loop {
            match self.from_client.try_recv() {
                Ok(f) => frames.push(f),
                Err(mpsc::error::TryRecvError::Empty) => return (frames, false),
                Err(mpsc::error::TryRecvError::Disconnected) => return (frames, true),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Accept,
    Refuse,
    /// Handshake never completes.
    Stall,
    /// Connector panics mid-handshake.
    Panic,
}

pub struct ScriptedConnector {
    attempts: AtomicUsize,
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    peers: Mutex<VecDeque<Peer>>,
}

impl ScriptedConnector {
    pub fn accepting() -> Arc<Self> {
        Self::with(Vec::new(), Outcome::Accept)
    }

    pub fn refusing() -> Arc<Self> {
        Self::with(Vec::new(), Outcome::Refuse)
    }

    /// Follow `script` in order, then `fallback` forever.
    pub fn with(script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
            fallback,
            peers: Mutex::new(VecDeque::new()),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn take_peer(&self) -> Peer {
        self.peers
            .lock()
            .unwrap()
            .pop_front()
            .expect("no accepted link")
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _endpoint: &str) -> Result<Link> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match outcome {
            Outcome::Accept => {}
            Outcome::Refuse => {
                return Err(ChatLinkError::Transport("connection refused".into()));
            }
            Outcome::Stall => std::future::pending::<()>().await,
            Outcome::Panic => panic!("connector blew up"),
        }

        let (client_tx, peer_rx) = mpsc::channel(16);
        let (peer_tx, client_rx) = mpsc::channel(16);
        self.peers.lock().unwrap().push_back(Peer {
            to_client: peer_tx,
            from_client: peer_rx,
        });
        Ok(Link {
            outbound: client_tx,
            inbound: client_rx,
        })
    }
}

/// Observer that records every callback as a short string.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<String>>,
    pub messages: Mutex<Vec<Envelope>>,
    pub errors: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == name).count()
    }

    pub fn contents(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.content.clone())
            .collect()
    }

    fn push(&self, e: impl Into<String>) {
        self.events.lock().unwrap().push(e.into());
    }
}

impl Observer for Recorder {
    fn on_open(&self) {
        self.push("open");
    }
    fn on_close(&self) {
        self.push("close");
    }
    fn on_error(&self, err: &ChatLinkError) {
        self.errors.lock().unwrap().push(err.to_string());
        self.push("error");
    }
    fn on_message(&self, env: &Envelope) {
        self.push("message");
        self.messages.lock().unwrap().push(env.clone());
    }
    fn on_typing(&self, typing: &TypingState) {
        self.push(if typing.active { "typing:on" } else { "typing:off" });
    }
    fn on_state(&self, state: ConnState) {
        self.push(format!("state:{}", state.as_str()));
    }
    fn on_gave_up(&self, retries: u32) {
        self.push(format!("gave_up:{retries}"));
    }
}

pub fn section(max_retries: u32, delay_ms: u64) -> ClientSection {
    let mut cfg = ClientSection::default();
    cfg.endpoint = "ws://chat.test/ws/chat".into();
    cfg.retry.max_retries = max_retries;
    cfg.retry.delay_ms = delay_ms;
    cfg
}

/// Let spawned tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock, then let woken tasks run.
pub async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}
