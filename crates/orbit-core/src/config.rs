//! Client configuration model.
//!
//! Loaded once from `config.toml` by the infrastructure layer. Every field
//! has a default so a partial (or missing) file is valid.

use serde::{Deserialize, Serialize};

use crate::session::TrackEncoding;
use crate::slash_command::Command;

/// Which transport reaches the backend.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Spawn a local program per query.
    #[default]
    Process,
    /// POST to an HTTP endpoint.
    Http,
}

/// How answers are delivered.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// `process_query_stream` + event channels.
    #[default]
    Streaming,
    /// `ask_orbit`, one full response.
    SingleShot,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub delivery: DeliveryMode,
    #[serde(default)]
    pub track_encoding: TrackEncoding,
    /// Program for [`BackendKind::Process`]
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Base URL for [`BackendKind::Http`]
    #[serde(default = "default_url")]
    pub url: String,
    /// Upper bound for one backend invocation, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            delivery: DeliveryMode::default(),
            track_encoding: TrackEncoding::default(),
            program: default_program(),
            args: Vec::new(),
            url: default_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OrbitConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub backend: BackendConfig,
    /// Extra palette entries appended after the builtins
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: BackendConfig::default(),
            commands: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_program() -> String {
    "orbit-agent".to_string()
}

fn default_url() -> String {
    "http://127.0.0.1:7878".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}
