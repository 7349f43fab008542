#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use chatlink_client::config::{self, BackoffStrategy};
use chatlink_client::session::Backoff;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
client:
  endpoint: "ws://localhost:8000/ws/chat"
  retry:
    max_retrys: 3 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.client.endpoint, "ws://localhost:8000/ws/chat");
    assert!(!cfg.client.auto_connect);
    assert_eq!(cfg.client.retry.max_retries, 5);
    assert_eq!(cfg.client.retry.strategy, BackoffStrategy::Fixed);
    assert_eq!(
        cfg.client.retry.policy().delay_for(1),
        Duration::from_millis(3000)
    );
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn endpoint_must_be_websocket_url() {
    for endpoint in ["http://localhost:8000/ws/chat", "not a url"] {
        let src = format!("version: 1\nclient:\n  endpoint: \"{endpoint}\"\n");
        let err = config::load_from_str(&src).expect_err("must fail");
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "endpoint={endpoint}");
    }
    let ok = "version: 1\nclient:\n  endpoint: \"wss://chat.example.com/ws/chat\"\n";
    assert!(config::load_from_str(ok).is_ok());
}

#[test]
fn exponential_policy() {
    let src = r#"
version: 1
client:
  auto_connect: true
  retry:
    max_retries: 4
    strategy: exponential
    delay_ms: 500
    max_delay_ms: 1500
"#;
    let cfg = config::load_from_str(src).expect("must parse");
    let policy = cfg.client.retry.policy();
    assert_eq!(policy.max_retries, 4);
    assert_eq!(
        policy.backoff,
        Backoff::Exponential {
            initial: Duration::from_millis(500),
            max: Duration::from_millis(1500),
        }
    );
    assert_eq!(policy.delay_for(3), Duration::from_millis(1500));
}

#[test]
fn range_checks() {
    let cases = [
        "version: 1\nclient:\n  outbound_buffer: 0\n",
        "version: 1\nclient:\n  connect_timeout_ms: 10\n",
        "version: 1\nclient:\n  retry:\n    delay_ms: 10\n",
        "version: 1\nclient:\n  retry:\n    max_retries: 1000\n",
        "version: 1\nclient:\n  retry:\n    strategy: exponential\n    delay_ms: 5000\n    max_delay_ms: 1000\n",
    ];
    for src in cases {
        let err = config::load_from_str(src).expect_err("must fail");
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "src={src}");
    }
}

#[test]
fn shipped_probe_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../chatlink.yaml");
    let cfg = config::load_from_file(path).unwrap();
    assert!(cfg.client.auto_connect);
    assert_eq!(cfg.client.retry.max_retries, 5);
    assert_eq!(cfg.client.retry.delay_ms, 3000);
    assert_eq!(cfg.client.connect_timeout(), Duration::from_secs(10));
}
