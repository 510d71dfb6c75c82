use std::io::Write;
use std::time::Duration;

use officeflow_core::config::AppConfig;
use officeflow_core::error::OfficeflowError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[backend]
base_url = "https://office.example.com"
token = "test-token"
timeout_secs = 5

[sync]
grace_period_ms = 250
reconnect_delay_ms = 1000
max_reconnect_attempts = 20
log_tail = 100
transcript_tail = 50
event_bus_capacity = 32

[log]
filter = "officeflow=debug"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.backend.base_url, "https://office.example.com");
    assert_eq!(config.backend.token, Some("test-token".to_string()));
    assert_eq!(config.backend.timeout_secs, 5);
    assert_eq!(config.backend.push_url(), "wss://office.example.com");
    assert_eq!(config.sync.grace_period(), Duration::from_millis(250));
    assert_eq!(config.sync.reconnect_delay(), Duration::from_secs(1));
    assert_eq!(config.sync.max_reconnect_attempts, Some(20));
    assert_eq!(config.sync.log_tail, 100);
    assert_eq!(config.sync.transcript_tail, 50);
    assert_eq!(config.sync.event_bus_capacity, 32);
    assert_eq!(config.log.filter.as_deref(), Some("officeflow=debug"));
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("OFFICEFLOW_TEST_TOKEN", "expanded-token");

    let toml_content = r#"
[backend]
token = "${OFFICEFLOW_TEST_TOKEN}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.backend.token, Some("expanded-token".to_string()));

    std::env::remove_var("OFFICEFLOW_TEST_TOKEN");
}

#[test]
fn test_minimal_config_uses_defaults() {
    let toml_content = r#"
[backend]
base_url = "http://10.0.0.5:8420"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.backend.push_url(), "ws://10.0.0.5:8420");
    assert!(config.backend.token.is_none());
    assert_eq!(config.sync.grace_period_ms, 100);
    assert_eq!(config.sync.reconnect_delay_ms, 3000);
    assert!(config.sync.max_reconnect_attempts.is_none());
    assert_eq!(config.sync.transcript_tail, 200);
    assert!(config.log.filter.is_none());
}

#[test]
fn test_missing_file_is_config_not_found() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("absent.toml");

    let err = AppConfig::load(&path).unwrap_err();
    assert!(matches!(err, OfficeflowError::ConfigNotFound(_)));

    let config = AppConfig::load_or_default(&path).expect("defaults");
    assert_eq!(config.backend.base_url, "http://127.0.0.1:8420");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[sync]\ngrace_period_ms = \"soon\"\n").expect("write toml");

    let err = AppConfig::load(tmp.path()).unwrap_err();
    assert!(matches!(err, OfficeflowError::Config(_)));
}
