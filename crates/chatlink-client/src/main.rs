//! chatlink probe
//!
//! Interactive check of a chat backend:
//! - connects to `client.endpoint` from the config file (default `chatlink.yaml`)
//! - prints every envelope, typing change and state change
//! - sends each stdin line as a user message
//!
//! Commands: /connect /disconnect /state /log /metrics /quit

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use chatlink_client::config::{self, ClientConfig};
use chatlink_client::conversation::{ChatSession, MemoryStore, SessionContext};
use chatlink_client::session::{ConnState, ConnectionManager, Observer, TypingState};
use chatlink_core::error::ChatLinkError;
use chatlink_core::protocol::Envelope;

const PROBE_CONVERSATION: &str = "probe";

struct Printer {
    replies: mpsc::UnboundedSender<Envelope>,
}

impl Observer for Printer {
    fn on_state(&self, state: ConnState) {
        println!("[state] {}", state.as_str());
    }

    fn on_error(&self, err: &ChatLinkError) {
        eprintln!("[error] {err}");
    }

    fn on_message(&self, env: &Envelope) {
        println!("[{} {}] {}", env.role.as_str(), env.kind.as_str(), env.content);
        if let Some(report) = env.report() {
            println!("[report] {} chars, open /log to review", report.body.chars().count());
        }
        let _ = self.replies.send(env.clone());
    }

    fn on_typing(&self, typing: &TypingState) {
        if typing.active {
            println!("[typing] ...");
        }
    }

    fn on_gave_up(&self, retries: u32) {
        eprintln!("[gave up] {retries} reconnect attempts failed, use /connect");
    }
}

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "chatlink.yaml".into());
    let cfg = if Path::new(&path).exists() {
        config::load_from_file(&path).expect("config load failed")
    } else {
        tracing::info!(%path, "config file not found, using defaults");
        ClientConfig::default()
    };

    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
    let manager = ConnectionManager::builder(cfg.client.clone())
        .build()
        .expect("client config invalid");
    manager.subscribe(Arc::new(Printer { replies: reply_tx }));
    let metrics = manager.metrics();

    tracing::info!(endpoint = manager.endpoint(), "chatlink-probe starting");
    manager.connect();

    let ctx = SessionContext::new("probe");
    let mut chat = ChatSession::new(ctx, Arc::new(MemoryStore::new()), manager);
    if let Err(e) = chat.open_conversation(PROBE_CONVERSATION).await {
        eprintln!("[store] {e}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let mgr = chat.manager();
                match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/connect" => mgr.connect(),
                    "/disconnect" => mgr.disconnect(),
                    "/state" => println!(
                        "[state] {} retries={} exhausted={}",
                        mgr.state().as_str(),
                        mgr.retry_count(),
                        mgr.retries_exhausted()
                    ),
                    "/log" => {
                        for env in mgr.events() {
                            println!(
                                "{} [{} {}] {}",
                                env.timestamp.to_rfc3339(),
                                env.role.as_str(),
                                env.kind.as_str(),
                                env.content
                            );
                        }
                    }
                    "/metrics" => {
                        let log_len = mgr.event_count() as u64;
                        print!("{}", metrics.render(&[("chatlink_event_log_len", log_len)]));
                    }
                    text => {
                        if let Err(e) = chat.send(text).await {
                            eprintln!("[send failed] {e}");
                        }
                    }
                }
            }

            Some(env) = reply_rx.recv() => {
                if let Err(e) = chat.record_reply(&env).await {
                    tracing::warn!(error = %e, "reply not persisted");
                }
            }
        }
    }

    chat.manager().disconnect();
}
