//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure populated from
//! environment variables (with `.env` support) on top of defaults. Parsing
//! goes through [`Config::from_lookup`] so it can be exercised without
//! touching the process environment.

use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Source of configuration values, keyed by environment variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Splunk connection settings.
    pub backend: BackendConfig,

    /// Deadline and retry settings for tool dispatch.
    pub dispatch: DispatchConfig,

    /// Streaming adapter settings.
    pub streaming: StreamingConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Splunk connection settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    /// `https` or `http`.
    pub scheme: String,
    pub username: String,
    pub password: String,
    /// Bearer token. Takes precedence over username/password when set.
    pub token: Option<String>,
    pub verify_tls: bool,
    /// Per-request timeout for REST calls.
    pub request_timeout_ms: u64,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("verify_tls", &self.verify_tls)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8089,
            scheme: "https".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            token: None,
            verify_tls: true,
            request_timeout_ms: 30_000,
        }
    }
}

/// Dispatch deadline and backend retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Upper bound on a single tool invocation.
    pub deadline_ms: u64,

    /// Backoff before the single retry of a transient backend failure.
    pub retry_backoff_ms: u64,

    /// Cap on the retry backoff.
    pub retry_max_backoff_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 60_000,
            retry_backoff_ms: 250,
            retry_max_backoff_ms: 2_000,
        }
    }
}

impl DispatchConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Streaming (SSE) adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Interval between heartbeat events on an open connection.
    pub heartbeat_interval_ms: u64,

    /// Requests a connection may have queued before new ones are refused.
    pub request_queue_depth: usize,

    /// Requests a connection may have dispatched concurrently.
    pub max_in_flight: usize,

    /// Path of the event stream.
    pub sse_path: String,

    /// Path of the companion request channel.
    pub messages_path: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 30_000,
            request_queue_depth: 32,
            max_in_flight: 8,
            sse_path: "/sse".to_string(),
            messages_path: "/messages".to_string(),
        }
    }
}

impl StreamingConfig {
    /// Heartbeat period, never zero.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "splunk-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            backend: BackendConfig::default(),
            dispatch: DispatchConfig::default(),
            streaming: StreamingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, reading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Build configuration from a key lookup.
    ///
    /// Unset keys keep their defaults. Unparseable values are logged and
    /// ignored.
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let mut config = Self::default();

        if let Some(name) = lookup("MCP_SERVER_NAME") {
            config.server.name = name;
        }
        if let Some(level) = lookup("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }
        if parse_flag(lookup, "DEBUG", false) {
            config.logging.level = "debug".to_string();
        }

        config.transport = TransportConfig::from_lookup(lookup);

        let backend = &mut config.backend;
        if let Some(host) = lookup("SPLUNK_HOST") {
            backend.host = host;
        }
        backend.port = parse_or(lookup, "SPLUNK_PORT", backend.port);
        if let Some(scheme) = lookup("SPLUNK_SCHEME") {
            backend.scheme = scheme.to_lowercase();
        }
        if let Some(username) = lookup("SPLUNK_USERNAME") {
            backend.username = username;
        }
        if let Some(password) = lookup("SPLUNK_PASSWORD") {
            backend.password = password;
        }
        backend.token = lookup("SPLUNK_TOKEN").filter(|t| !t.is_empty());
        backend.verify_tls = parse_flag(lookup, "VERIFY_SSL", backend.verify_tls);
        backend.request_timeout_ms = parse_or(lookup, "MCP_BACKEND_TIMEOUT_SECS", 30u64) * 1000;

        let dispatch = &mut config.dispatch;
        dispatch.deadline_ms = parse_or(lookup, "MCP_DISPATCH_TIMEOUT_SECS", 60u64) * 1000;
        dispatch.retry_backoff_ms = parse_or(lookup, "MCP_RETRY_BACKOFF_MS", dispatch.retry_backoff_ms);
        dispatch.retry_max_backoff_ms =
            parse_or(lookup, "MCP_RETRY_MAX_BACKOFF_MS", dispatch.retry_max_backoff_ms);

        config.streaming.heartbeat_interval_ms =
            parse_or(lookup, "MCP_HEARTBEAT_INTERVAL_SECS", 30u64) * 1000;

        config
    }
}

/// Parse `key`, falling back to `default` when unset or invalid.
pub(crate) fn parse_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }),
    }
}

/// Parse a boolean flag (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`).
pub(crate) fn parse_flag(lookup: Lookup<'_>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            default
        }
    }
}
