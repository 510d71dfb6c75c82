use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OfficeflowError, Result};

/// Top-level Officeflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// REST base URL of the backend service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Push channel base URL. Derived from `base_url` when absent.
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Bearer token sent with every REST request.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Push channel base URL: `ws_url` if set, else `base_url` with its
    /// scheme swapped to `ws`/`wss`.
    pub fn push_url(&self) -> String {
        if let Some(ref url) = self.ws_url {
            return url.trim_end_matches('/').to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        }
    }
}

fn default_base_url() -> String { "http://127.0.0.1:8420".to_string() }
fn default_timeout_secs() -> u64 { 30 }

/// Push-channel reconciler tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay before the first connect, absorbing subscribe/unsubscribe churn.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Fixed delay between a closed connection and the next attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Give up after this many consecutive failed epochs. Absent = never.
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,
    /// Maximum retained log entries.
    #[serde(default = "default_log_tail")]
    pub log_tail: usize,
    /// Maximum retained chat transcript entries.
    #[serde(default = "default_transcript_tail")]
    pub transcript_tail: usize,
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: default_grace_period_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: None,
            log_tail: default_log_tail(),
            transcript_tail: default_transcript_tail(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl SyncConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn default_grace_period_ms() -> u64 { 100 }
fn default_reconnect_delay_ms() -> u64 { 3000 }
fn default_log_tail() -> usize { 500 }
fn default_transcript_tail() -> usize { 200 }
fn default_event_bus_capacity() -> usize { 256 }

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` takes precedence.
    #[serde(default)]
    pub filter: Option<String>,
}

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| OfficeflowError::ConfigNotFound(path.display().to_string()))?;

        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| OfficeflowError::Config(e.to_string()))
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

/// Replace `${NAME}` with the value of environment variable `NAME`.
/// Unset variables and unterminated references are left as written.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(&rest[open..open + 2 + close + 1]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
