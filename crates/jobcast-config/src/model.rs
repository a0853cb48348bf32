// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Jobcast gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Jobcast configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobcastConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database and credential storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Transport session lifecycle.
    #[serde(default)]
    pub session: SessionConfig,

    /// Single and bulk message delivery.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Job broadcast pipeline.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Inbound message relay to the host platform.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Candidate matching service client.
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Display name used in logs and the health endpoint.
    #[serde(default = "default_gateway_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: default_gateway_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_gateway_name() -> String {
    "jobcast".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on `/v1/*`. `None` rejects every API request.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Serve Prometheus metrics at `/metrics`.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[redacted]"))
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_metrics_enabled() -> bool {
    true
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file (queue and job bookkeeping).
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory holding one credential file per session.
    #[serde(default = "default_auth_dir")]
    pub auth_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            auth_dir: default_auth_dir(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("jobcast").join("jobcast.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("jobcast.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_auth_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("jobcast").join("auth"))
        .unwrap_or_else(|| std::path::PathBuf::from("auth"))
        .to_string_lossy()
        .into_owned()
}

/// Transport session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Session used for broadcasts and template sends.
    #[serde(default = "default_session_id")]
    pub default_session_id: String,

    /// WebSocket URL of the protocol bridge sidecar.
    #[serde(default = "default_transport_url")]
    pub transport_url: String,

    /// Fixed delay before reconnecting a dropped session.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Upper bound on opening one transport connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Reopen every session with stored credentials at startup.
    #[serde(default = "default_true")]
    pub restore_on_start: bool,

    /// Create the default session at startup if it has no credentials yet.
    #[serde(default = "default_true")]
    pub auto_create_default: bool,
}

impl SessionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_session_id: default_session_id(),
            transport_url: default_transport_url(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            restore_on_start: true,
            auto_create_default: true,
        }
    }
}

fn default_session_id() -> String {
    "default".to_string()
}

fn default_transport_url() -> String {
    "ws://127.0.0.1:8787/sessions".to_string()
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Message delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Country calling code used to normalize local numbers (digits only).
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Upper bound for a single transport send.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Pause between consecutive sends of a bulk run.
    #[serde(default = "default_bulk_delay_ms")]
    pub bulk_delay_ms: u64,
}

impl DispatchConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn bulk_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_delay_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            send_timeout_secs: default_send_timeout_secs(),
            bulk_delay_ms: default_bulk_delay_ms(),
        }
    }
}

fn default_country_code() -> String {
    "62".to_string()
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_bulk_delay_ms() -> u64 {
    2000
}

/// Job broadcast pipeline configuration.
///
/// The retry fields form the policy of the durable queue entry that carries
/// each run: attempts, backoff between attempts, and the per-run timeout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastConfig {
    /// Master switch. When false, lifecycle events never schedule runs.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of matched applicants messaged per run.
    #[serde(default = "default_max_recipients")]
    pub max_recipients: usize,

    /// Delay between the triggering event and the run.
    #[serde(default = "default_trigger_delay_secs")]
    pub trigger_delay_secs: u64,

    /// Attempts per run, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before each retry, in seconds; the last value repeats.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: Vec<u64>,

    /// Wall-clock limit of one run.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Queue poll interval of the broadcast worker.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl BroadcastConfig {
    pub fn trigger_delay(&self) -> Duration {
        Duration::from_secs(self.trigger_delay_secs)
    }

    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_recipients: default_max_recipients(),
            trigger_delay_secs: default_trigger_delay_secs(),
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_max_recipients() -> usize {
    100
}

fn default_trigger_delay_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_secs() -> Vec<u64> {
    vec![10, 30, 60]
}

fn default_run_timeout_secs() -> u64 {
    300
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Inbound relay configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Endpoint receiving inbound message envelopes. `None` disables the relay.
    #[serde(default)]
    pub url: Option<String>,

    /// Bearer credential sent with each relay POST.
    #[serde(default)]
    pub token: Option<String>,

    /// Timeout of one relay POST.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_webhook_timeout_secs() -> u64 {
    5
}

/// Matching service client configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Base URL of the host platform API.
    #[serde(default = "default_matching_base_url")]
    pub base_url: String,

    /// Bearer credential for the matching endpoint.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_matching_timeout_secs")]
    pub timeout_secs: u64,
}

impl MatchingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for MatchingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            base_url: default_matching_base_url(),
            token: None,
            timeout_secs: default_matching_timeout_secs(),
        }
    }
}

fn default_matching_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_matching_timeout_secs() -> u64 {
    15
}
