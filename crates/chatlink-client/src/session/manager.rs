//! Connection manager: drives the session machine on the tokio runtime.
//!
//! Responsibilities:
//! - Own the single link to `endpoint` (open, write, close)
//! - Run the reconnect timer and cancel it on `disconnect()`
//! - Decode inbound frames once, append displayable envelopes to the log,
//!   route typing signals to the typing track
//! - Fan lifecycle and message events out to observers
//!
//! Locking: `core` is a plain mutex that is never held across an await or
//! while observers run. Socket tasks and timers re-check their epoch under
//! the lock, so every state transition is atomic with respect to the others.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

use chatlink_core::error::{ChatLinkError, ErrorCode, Result};
use chatlink_core::protocol::{Envelope, MsgType, Report, Role};

use crate::config::ClientSection;
use crate::obs::ClientMetrics;
use crate::session::log::{EventLog, ReportSlot, TypingState, TypingTrack};
use crate::session::machine::{Action, ConnState, Epoch, Notice, Session};
use crate::session::observer::{Callbacks, Observer, ObserverRegistry, SubscriptionId};
use crate::transport::{codec, Connector, Frame, Link, WsConnector};

struct Core {
    session: Session,
    writer: Option<mpsc::Sender<Frame>>,
    link_task: Option<AbortHandle>,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    endpoint: String,
    connect_timeout: Duration,
    connector: Arc<dyn Connector>,
    core: Mutex<Core>,
    log: EventLog,
    typing: TypingTrack,
    report: ReportSlot,
    observers: ObserverRegistry,
    metrics: Arc<ClientMetrics>,
}

/// Builder for `ConnectionManager` (construction-time options and callbacks).
pub struct ManagerBuilder {
    cfg: ClientSection,
    connector: Option<Arc<dyn Connector>>,
    callbacks: Callbacks,
    metrics: Option<Arc<ClientMetrics>>,
}

impl ManagerBuilder {
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn metrics(mut self, metrics: Arc<ClientMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.open = Some(Box::new(move |()| f()));
        self
    }

    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callbacks.close = Some(Box::new(move |()| f()));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&ChatLinkError) + Send + Sync + 'static) -> Self {
        self.callbacks.error = Some(Box::new(f));
        self
    }

    pub fn on_message(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.callbacks.message = Some(Box::new(f));
        self
    }

    pub fn on_typing(mut self, f: impl Fn(&TypingState) + Send + Sync + 'static) -> Self {
        self.callbacks.typing = Some(Box::new(f));
        self
    }

    /// Validate the section and build. With `auto_connect` set this also
    /// calls `connect()`, so it must run inside a tokio runtime.
    pub fn build(self) -> Result<ConnectionManager> {
        self.cfg.validate()?;

        let connector: Arc<dyn Connector> = match self.connector {
            Some(c) => c,
            None => Arc::new(WsConnector::new(self.cfg.outbound_buffer)),
        };
        let metrics = self.metrics.unwrap_or_default();
        metrics.set_state(ConnState::Disconnected.as_str());

        let shared = Arc::new(Shared {
            endpoint: self.cfg.endpoint.clone(),
            connect_timeout: self.cfg.connect_timeout(),
            connector,
            core: Mutex::new(Core {
                session: Session::new(self.cfg.retry.policy()),
                writer: None,
                link_task: None,
                timer: None,
            }),
            log: EventLog::new(),
            typing: TypingTrack::default(),
            report: ReportSlot::default(),
            observers: ObserverRegistry::new(),
            metrics,
        });

        if !self.callbacks.is_empty() {
            shared.observers.subscribe(Arc::new(self.callbacks));
        }

        let mgr = ConnectionManager { shared };
        if self.cfg.auto_connect {
            mgr.connect();
        }
        Ok(mgr)
    }
}

/// Owner of one duplex connection and its ordered inbound event log.
///
/// Dropping the manager disconnects, cancels timers and drops all observers.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn builder(cfg: ClientSection) -> ManagerBuilder {
        ManagerBuilder {
            cfg,
            connector: None,
            callbacks: Callbacks::default(),
            metrics: None,
        }
    }

    /// Open the connection. No-op unless currently disconnected.
    pub fn connect(&self) {
        self.shared.drive(|core| core.session.connect());
    }

    /// Close the connection and cancel any pending reconnect.
    /// No automatic reconnect happens until `connect()` is called again.
    pub fn disconnect(&self) {
        self.shared.drive(|core| core.session.disconnect());
    }

    /// Send a user text message. Returns `false` without side effects unless
    /// the connection is open. The message is not echoed into the event log.
    pub fn send(&self, text: &str) -> bool {
        let m = &self.shared.metrics;
        let core = self.shared.core();
        if core.session.state() != ConnState::Connected {
            m.sends_rejected.inc(&[("reason", "not_connected")]);
            tracing::debug!(state = core.session.state().as_str(), "send rejected");
            return false;
        }
        let Some(writer) = core.writer.as_ref() else {
            m.sends_rejected.inc(&[("reason", "not_connected")]);
            return false;
        };

        let wire = match Envelope::user_text(text).to_wire() {
            Ok(w) => w,
            Err(e) => {
                m.sends_rejected.inc(&[("reason", "encode")]);
                tracing::warn!(error = %e, "outbound encode failed");
                return false;
            }
        };

        match writer.try_send(Frame::Text(wire)) {
            Ok(()) => {
                m.frames_out.inc(&[("type", MsgType::Text.as_str())]);
                true
            }
            Err(e) => {
                m.sends_rejected.inc(&[("reason", "buffer")]);
                tracing::warn!(error = %e, "outbound buffer unavailable");
                false
            }
        }
    }

    pub fn state(&self) -> ConnState {
        self.shared.core().session.state()
    }

    pub fn retry_count(&self) -> u32 {
        self.shared.core().session.retry_count()
    }

    /// True once automatic reconnects gave up; cleared by `connect()`.
    pub fn retries_exhausted(&self) -> bool {
        self.shared.core().session.exhausted()
    }

    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Snapshot of the event log, in receipt order.
    pub fn events(&self) -> Vec<Arc<Envelope>> {
        self.shared.log.snapshot()
    }

    pub fn event_count(&self) -> usize {
        self.shared.log.len()
    }

    /// Drop the log and preview (e.g. when switching conversations).
    pub fn clear_events(&self) {
        self.shared.log.clear();
        self.shared.report.clear();
    }

    pub fn typing(&self) -> TypingState {
        self.shared.typing.get()
    }

    pub fn latest_report(&self) -> Option<Report> {
        self.shared.report.get()
    }

    pub fn subscribe(&self, obs: Arc<dyn Observer>) -> SubscriptionId {
        self.shared.observers.subscribe(obs)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.observers.unsubscribe(id)
    }

    pub fn metrics(&self) -> Arc<ClientMetrics> {
        Arc::clone(&self.shared.metrics)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shared.observers.clear();
        self.disconnect();
    }
}

impl Shared {
    fn core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn is_current(&self, epoch: Epoch) -> bool {
        self.core().session.epoch() == epoch
    }

    /// Feed one input to the machine, execute its actions under the lock,
    /// then notify observers with the lock released.
    fn drive(self: &Arc<Self>, f: impl FnOnce(&mut Core) -> Vec<Action>) {
        let notices = {
            let mut core = self.core();
            let actions = f(&mut core);
            self.execute(&mut core, actions)
        };
        self.notify(notices);
    }

    fn execute(self: &Arc<Self>, core: &mut Core, actions: Vec<Action>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for action in actions {
            match action {
                Action::Open { epoch } => {
                    if let Some(old) = core.link_task.take() {
                        old.abort();
                    }
                    core.writer = None;
                    core.link_task = Some(self.spawn_link(epoch));
                }
                Action::Close => {
                    if let Some(writer) = core.writer.take() {
                        let _ = writer.try_send(Frame::Close);
                    }
                    if let Some(task) = core.link_task.take() {
                        task.abort();
                    }
                }
                Action::ScheduleReconnect { epoch, attempt, delay } => {
                    self.metrics.reconnects_scheduled.inc(&[]);
                    tracing::info!(
                        endpoint = %self.endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "reconnect scheduled"
                    );
                    let shared = Arc::clone(self);
                    let timer = tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        shared.drive(|core| core.session.reconnect_due(epoch));
                    });
                    if let Some(old) = core.timer.replace(timer) {
                        old.abort();
                    }
                }
                Action::CancelReconnect => {
                    if let Some(timer) = core.timer.take() {
                        timer.abort();
                    }
                }
                Action::Notify(notice) => {
                    if let Notice::State(s) = &notice {
                        self.metrics.set_state(s.as_str());
                    }
                    notices.push(notice);
                }
            }
        }
        notices
    }

    /// Spawn the link task for `epoch` plus a watcher that turns a panic
    /// inside it into a transport failure instead of a stuck `Connecting`.
    fn spawn_link(self: &Arc<Self>, epoch: Epoch) -> AbortHandle {
        let shared = Arc::clone(self);
        let link = tokio::spawn(async move { shared.run_link(epoch).await });
        let abort = link.abort_handle();

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = link.await {
                if e.is_panic() {
                    tracing::error!(endpoint = %shared.endpoint, epoch, "link task panicked");
                    shared.drive(|core| core.session.failed(epoch, "link task panicked"));
                }
            }
        });
        abort
    }

    fn notify(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let observers = self.observers.snapshot();
        for notice in notices {
            match notice {
                Notice::State(s) => observers.iter().for_each(|o| o.on_state(s)),
                Notice::Opened => observers.iter().for_each(|o| o.on_open()),
                Notice::Closed => observers.iter().for_each(|o| o.on_close()),
                Notice::Failed(reason) => {
                    let err = ChatLinkError::Transport(reason);
                    observers.iter().for_each(|o| o.on_error(&err));
                }
                Notice::GaveUp { retries } => {
                    self.metrics.gave_up.inc(&[]);
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        retries,
                        "reconnect attempts exhausted"
                    );
                    observers.iter().for_each(|o| o.on_gave_up(retries));
                }
            }
        }
    }

    async fn run_link(self: Arc<Self>, epoch: Epoch) {
        self.metrics.connect_attempts.inc(&[]);
        tracing::info!(endpoint = %self.endpoint, epoch, "connecting");
        let started = Instant::now();

        let handshake = self.connector.connect(&self.endpoint);
        let link = match tokio::time::timeout(self.connect_timeout, handshake).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                self.metrics.connect_outcomes.inc(&[("outcome", "failed")]);
                tracing::warn!(endpoint = %self.endpoint, error = %e, "connect failed");
                self.drive(|core| core.session.failed(epoch, e.to_string()));
                return;
            }
            Err(_) => {
                self.metrics.connect_outcomes.inc(&[("outcome", "timeout")]);
                tracing::warn!(
                    endpoint = %self.endpoint,
                    timeout_ms = self.connect_timeout.as_millis() as u64,
                    "connect timed out"
                );
                self.drive(|core| core.session.failed(epoch, "connect timed out"));
                return;
            }
        };
        self.metrics.connect_duration.observe(&[], started.elapsed());

        let Link { outbound, mut inbound } = link;
        let mut outbound = Some(outbound);
        self.drive(|core| {
            let actions = core.session.opened(epoch);
            if !actions.is_empty() {
                core.writer = outbound.take();
            }
            actions
        });
        if outbound.is_some() {
            // superseded while the handshake ran; dropping the sender closes it
            return;
        }
        self.metrics.connect_outcomes.inc(&[("outcome", "opened")]);
        tracing::info!(endpoint = %self.endpoint, epoch, "connected");

        let mut fault = None;
        while let Some(frame) = inbound.recv().await {
            if !self.is_current(epoch) {
                return;
            }
            match frame {
                Frame::Close => break,
                Frame::Fault(reason) => {
                    fault = Some(reason);
                    break;
                }
                other => {
                    if let Some(env) = codec::inbound_envelope(other) {
                        if !self.dispatch(epoch, env) {
                            return;
                        }
                    }
                }
            }
        }

        tracing::info!(endpoint = %self.endpoint, epoch, fault = ?fault, "connection lost");
        self.drive(|core| {
            if core.session.epoch() == epoch {
                core.writer = None;
            }
            match fault {
                Some(reason) => core.session.failed(epoch, reason),
                None => core.session.closed(epoch),
            }
        });
    }

    /// Apply one inbound envelope for `epoch`. Returns false when the link
    /// was superseded, in which case nothing was logged or delivered.
    fn dispatch(&self, epoch: Epoch, env: Envelope) -> bool {
        self.metrics.frames_in.inc(&[("type", env.kind.as_str())]);
        if is_decode_failure(&env) {
            self.metrics.decode_errors.inc(&[]);
        }

        // applied under the core lock: a concurrent disconnect() either
        // sees this envelope logged or wins and it is dropped
        let delivery = {
            let core = self.core();
            if core.session.epoch() != epoch {
                return false;
            }
            self.apply(env)
        };

        if !self.is_current(epoch) {
            return false;
        }
        let observers = self.observers.snapshot();
        match delivery {
            Delivery::Typing(state) => observers.iter().for_each(|o| o.on_typing(&state)),
            Delivery::Message { env, cleared } => {
                if let Some(state) = &cleared {
                    observers.iter().for_each(|o| o.on_typing(state));
                }
                observers.iter().for_each(|o| o.on_message(&env));
            }
        }
        true
    }

    fn apply(&self, env: Envelope) -> Delivery {
        if env.kind == MsgType::Typing {
            let active = env.typing.unwrap_or(false);
            let state = self
                .typing
                .set(active, env.timestamp)
                .unwrap_or_else(|| self.typing.get());
            tracing::debug!(active, "typing indicator");
            return Delivery::Typing(state);
        }

        // a reply from the other side ends any typing indicator
        let cleared = if env.role != Role::User {
            self.typing.set(false, env.timestamp)
        } else {
            None
        };
        if let Some(report) = env.report() {
            self.report.set(report);
        }

        let env = Arc::new(env);
        let len = self.log.append(Arc::clone(&env));
        tracing::debug!(
            kind = env.kind.as_str(),
            role = env.role.as_str(),
            len,
            "envelope appended"
        );
        Delivery::Message { env, cleared }
    }
}

enum Delivery {
    Typing(TypingState),
    Message {
        env: Arc<Envelope>,
        cleared: Option<TypingState>,
    },
}

fn is_decode_failure(env: &Envelope) -> bool {
    env.kind == MsgType::Error
        && env.metadata.get("code").and_then(|c| c.as_str())
            == Some(ErrorCode::DecodeFailed.as_str())
}
