//! Session layer: state machine, retry policy, event log, observers and the
//! manager that drives them.

pub mod log;
pub mod machine;
pub mod manager;
pub mod observer;
pub mod retry;

pub use log::{EventLog, TypingState, TypingTrack};
pub use machine::{Action, ConnState, Notice, Session};
pub use manager::{ConnectionManager, ManagerBuilder};
pub use observer::{Callbacks, Observer, ObserverRegistry, SubscriptionId};
pub use retry::{Backoff, RetryPolicy};
