//! Observer interface and subscription registry.
//!
//! Observers are invoked synchronously, in registration order, after the
//! manager has released its internal locks. An observer may therefore call
//! back into the manager (`send`, `disconnect`, ...).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use chatlink_core::error::ChatLinkError;
use chatlink_core::protocol::Envelope;

use crate::session::log::TypingState;
use crate::session::machine::ConnState;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

pub trait Observer: Send + Sync {
    fn on_open(&self) {}
    fn on_close(&self) {}
    fn on_error(&self, _err: &ChatLinkError) {}
    fn on_message(&self, _env: &Envelope) {}
    fn on_typing(&self, _typing: &TypingState) {}
    fn on_state(&self, _state: ConnState) {}
    /// Automatic reconnects are exhausted; only `connect()` restarts.
    fn on_gave_up(&self, _retries: u32) {}
}

type Hook<T> = Option<Box<dyn Fn(T) + Send + Sync>>;

/// Closure-backed observer for construction-time callbacks.
#[derive(Default)]
pub struct Callbacks {
    pub(crate) open: Hook<()>,
    pub(crate) close: Hook<()>,
    pub(crate) error: Option<Box<dyn Fn(&ChatLinkError) + Send + Sync>>,
    pub(crate) message: Option<Box<dyn Fn(&Envelope) + Send + Sync>>,
    pub(crate) typing: Option<Box<dyn Fn(&TypingState) + Send + Sync>>,
}

impl Callbacks {
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.close.is_none()
            && self.error.is_none()
            && self.message.is_none()
            && self.typing.is_none()
    }
}

impl Observer for Callbacks {
    fn on_open(&self) {
        if let Some(f) = &self.open {
            f(())
        }
    }
    fn on_close(&self) {
        if let Some(f) = &self.close {
            f(())
        }
    }
    fn on_error(&self, err: &ChatLinkError) {
        if let Some(f) = &self.error {
            f(err)
        }
    }
    fn on_message(&self, env: &Envelope) {
        if let Some(f) = &self.message {
            f(env)
        }
    }
    fn on_typing(&self, typing: &TypingState) {
        if let Some(f) = &self.typing {
            f(typing)
        }
    }
}

/// Registry: `SubscriptionId -> Observer`.
pub struct ObserverRegistry {
    observers: DashMap<SubscriptionId, Arc<dyn Observer>>,
    seq: AtomicU64,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, obs: Arc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.seq.fetch_add(1, Ordering::Relaxed));
        self.observers.insert(id, obs);
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn clear(&self) {
        self.observers.clear();
    }

    /// Observers in registration order. Cloned out so no map shard stays
    /// locked while callbacks run.
    pub fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        let mut entries: Vec<(SubscriptionId, Arc<dyn Observer>)> = self
            .observers
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter().map(|(_, o)| o).collect()
    }
}
