//! Reconnect policy: bounded attempts with fixed or exponential delay.
//!
//! Delays are deterministic (no jitter) so timing can be asserted in tests.

use std::time::Duration;

/// Delay shape between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed { delay: Duration },
    /// `initial * 2^(attempt-1)`, capped at `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    pub fn fixed_ms(ms: u64) -> Self {
        Backoff::Fixed {
            delay: Duration::from_millis(ms),
        }
    }

    pub fn exponential_ms(initial_ms: u64, max_ms: u64) -> Self {
        Backoff::Exponential {
            initial: Duration::from_millis(initial_ms),
            max: Duration::from_millis(max_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Backoff) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Whether the 1-based `attempt` is still within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt >= 1 && attempt <= self.max_retries
    }

    /// Delay before the 1-based `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed { delay } => delay,
            Backoff::Exponential { initial, max } => {
                let shift = attempt.saturating_sub(1).min(16);
                let ms = (initial.as_millis() as u64).saturating_mul(1u64 << shift);
                Duration::from_millis(ms).min(max)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Backoff::fixed_ms(3000))
    }
}
