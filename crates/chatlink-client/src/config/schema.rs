use std::time::Duration;

use serde::Deserialize;
use url::Url;

use chatlink_core::error::{ChatLinkError, Result};

use crate::session::retry::{Backoff, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub version: u32,

    #[serde(default)]
    pub client: ClientSection,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ChatLinkError::UnsupportedVersion);
        }
        self.client.validate()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: 1,
            client: ClientSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Invoke `connect()` as soon as the manager is built.
    #[serde(default)]
    pub auto_connect: bool,

    /// Frames buffered between `send()` and the socket writer.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Upper bound for one connect handshake; elapsing counts as a failure.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            auto_connect: false,
            outbound_buffer: default_outbound_buffer(),
            connect_timeout_ms: default_connect_timeout_ms(),
            retry: RetrySection::default(),
        }
    }
}

impl ClientSection {
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| ChatLinkError::BadConfig(format!("client.endpoint invalid: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChatLinkError::BadConfig(
                "client.endpoint must use ws:// or wss://".into(),
            ));
        }
        if !(1..=4096).contains(&self.outbound_buffer) {
            return Err(ChatLinkError::BadConfig(
                "client.outbound_buffer must be between 1 and 4096".into(),
            ));
        }
        if !(100..=120_000).contains(&self.connect_timeout_ms) {
            return Err(ChatLinkError::BadConfig(
                "client.connect_timeout_ms must be between 100 and 120000".into(),
            ));
        }
        self.retry.validate()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Exponential,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Fixed
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub strategy: BackoffStrategy,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            strategy: BackoffStrategy::default(),
            delay_ms: default_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > 100 {
            return Err(ChatLinkError::BadConfig(
                "client.retry.max_retries must be at most 100".into(),
            ));
        }
        if !(50..=600_000).contains(&self.delay_ms) {
            return Err(ChatLinkError::BadConfig(
                "client.retry.delay_ms must be between 50 and 600000".into(),
            ));
        }
        if self.strategy == BackoffStrategy::Exponential && self.max_delay_ms < self.delay_ms {
            return Err(ChatLinkError::BadConfig(
                "client.retry.max_delay_ms must be >= delay_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> RetryPolicy {
        let backoff = match self.strategy {
            BackoffStrategy::Fixed => Backoff::fixed_ms(self.delay_ms),
            BackoffStrategy::Exponential => {
                Backoff::exponential_ms(self.delay_ms, self.max_delay_ms)
            }
        };
        RetryPolicy::new(self.max_retries, backoff)
    }
}

fn default_endpoint() -> String {
    "ws://localhost:8000/ws/chat".into()
}
fn default_outbound_buffer() -> usize {
    64
}
fn default_connect_timeout_ms() -> u64 {
    10_000
}
fn default_max_retries() -> u32 {
    5
}
fn default_delay_ms() -> u64 {
    3000
}
fn default_max_delay_ms() -> u64 {
    30000
}
