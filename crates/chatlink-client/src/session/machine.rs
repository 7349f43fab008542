//! Connection state machine (pure, runtime-free).
//!
//! Every input returns the list of side effects the driver must perform.
//! An `epoch` counter is bumped whenever a new socket is opened or the caller
//! disconnects; socket events and reconnect timers carry the epoch they were
//! created under and are ignored once it is stale. That is what guarantees
//! nothing scheduled before `disconnect()` can reopen the connection.

use std::time::Duration;

use crate::session::retry::RetryPolicy;

pub type Epoch = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected => "connected",
        }
    }
}

/// Lifecycle events surfaced to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    State(ConnState),
    Opened,
    Closed,
    Failed(String),
    GaveUp { retries: u32 },
}

/// Side effects requested by the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open { epoch: Epoch },
    Close,
    ScheduleReconnect { epoch: Epoch, attempt: u32, delay: Duration },
    CancelReconnect,
    Notify(Notice),
}

#[derive(Debug)]
pub struct Session {
    policy: RetryPolicy,
    state: ConnState,
    retry_count: u32,
    epoch: Epoch,
    reconnect_pending: bool,
    exhausted: bool,
}

impl Session {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: ConnState::Disconnected,
            retry_count: 0,
            epoch: 0,
            reconnect_pending: false,
            exhausted: false,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Explicit connect. Starts a fresh retry budget.
    pub fn connect(&mut self) -> Vec<Action> {
        if self.state != ConnState::Disconnected {
            return Vec::new();
        }
        let mut out = Vec::new();
        if self.reconnect_pending {
            self.reconnect_pending = false;
            out.push(Action::CancelReconnect);
        }
        self.exhausted = false;
        self.retry_count = 0;
        self.open(&mut out);
        out
    }

    /// Socket for `epoch` finished its handshake.
    pub fn opened(&mut self, epoch: Epoch) -> Vec<Action> {
        if epoch != self.epoch || self.state != ConnState::Connecting {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.retry_count = 0;
        self.transition(ConnState::Connected, &mut out);
        out.push(Action::Notify(Notice::Opened));
        out
    }

    /// Socket for `epoch` failed to open or broke.
    pub fn failed(&mut self, epoch: Epoch, reason: impl Into<String>) -> Vec<Action> {
        self.lost(epoch, Some(reason.into()))
    }

    /// Socket for `epoch` was closed by the remote side.
    pub fn closed(&mut self, epoch: Epoch) -> Vec<Action> {
        self.lost(epoch, None)
    }

    /// Reconnect timer created under `epoch` fired.
    pub fn reconnect_due(&mut self, epoch: Epoch) -> Vec<Action> {
        if epoch != self.epoch || !self.reconnect_pending || self.state != ConnState::Disconnected {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.reconnect_pending = false;
        self.open(&mut out);
        out
    }

    /// Explicit disconnect. No automatic reconnect follows.
    pub fn disconnect(&mut self) -> Vec<Action> {
        if self.state == ConnState::Disconnected && !self.reconnect_pending {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.epoch += 1;
        if self.reconnect_pending {
            self.reconnect_pending = false;
            out.push(Action::CancelReconnect);
        }
        if self.state != ConnState::Disconnected {
            out.push(Action::Close);
            self.transition(ConnState::Disconnected, &mut out);
            out.push(Action::Notify(Notice::Closed));
        }
        out
    }

    fn open(&mut self, out: &mut Vec<Action>) {
        self.epoch += 1;
        self.transition(ConnState::Connecting, out);
        out.push(Action::Open { epoch: self.epoch });
    }

    fn lost(&mut self, epoch: Epoch, reason: Option<String>) -> Vec<Action> {
        if epoch != self.epoch || self.state == ConnState::Disconnected {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.transition(ConnState::Disconnected, &mut out);
        if let Some(reason) = reason {
            out.push(Action::Notify(Notice::Failed(reason)));
        }
        out.push(Action::Notify(Notice::Closed));

        let attempt = self.retry_count + 1;
        if self.policy.allows(attempt) {
            self.retry_count = attempt;
            self.reconnect_pending = true;
            out.push(Action::ScheduleReconnect {
                epoch: self.epoch,
                attempt,
                delay: self.policy.delay_for(attempt),
            });
        } else {
            self.exhausted = true;
            out.push(Action::Notify(Notice::GaveUp {
                retries: self.retry_count,
            }));
        }
        out
    }

    fn transition(&mut self, next: ConnState, out: &mut Vec<Action>) {
        if self.state != next {
            self.state = next;
            out.push(Action::Notify(Notice::State(next)));
        }
    }
}
