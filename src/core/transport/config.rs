//! Transport configuration types.

use serde::{Deserialize, Serialize};

use crate::core::config::Lookup;
#[cfg(feature = "http")]
use crate::core::config::{parse_flag, parse_or};
use crate::core::error::{Error, Result};

/// Transport configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    /// Line-framed standard input/output.
    #[cfg(feature = "stdio")]
    Stdio,

    /// HTTP server hosting the synchronous API and the SSE streaming adapter.
    #[cfg(feature = "http")]
    Http(HttpConfig),
}

/// HTTP transport configuration.
#[cfg(feature = "http")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Versioned prefix of the synchronous API routes.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,
}

#[cfg(feature = "http")]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[cfg(feature = "http")]
fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

#[cfg(feature = "http")]
fn default_cors() -> bool {
    true
}

impl Default for TransportConfig {
    fn default() -> Self {
        #[cfg(feature = "stdio")]
        {
            return Self::Stdio;
        }

        #[cfg(all(not(feature = "stdio"), feature = "http"))]
        {
            return Self::Http(HttpConfig::default());
        }

        #[cfg(not(any(feature = "stdio", feature = "http")))]
        {
            compile_error!("At least one transport feature must be enabled: stdio or http");
        }
    }
}

#[cfg(feature = "http")]
impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: default_host(),
            api_prefix: default_api_prefix(),
            enable_cors: default_cors(),
        }
    }
}

#[cfg(feature = "http")]
impl HttpConfig {
    /// Read `MCP_HTTP_*` settings. The port falls back to `FASTMCP_PORT`.
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let defaults = Self::default();
        let port_key = if lookup("MCP_HTTP_PORT").is_some() {
            "MCP_HTTP_PORT"
        } else {
            "FASTMCP_PORT"
        };
        let api_prefix = lookup("MCP_API_PREFIX")
            .map(|p| normalize_prefix(&p))
            .unwrap_or(defaults.api_prefix);

        Self {
            port: parse_or(lookup, port_key, defaults.port),
            host: lookup("MCP_HTTP_HOST").unwrap_or(defaults.host),
            api_prefix,
            enable_cors: parse_flag(lookup, "MCP_HTTP_CORS", defaults.enable_cors),
        }
    }
}

/// Leading slash, no trailing slash. An empty prefix mounts the API at the root.
#[cfg(feature = "http")]
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

impl TransportConfig {
    /// Load transport config from `MCP_TRANSPORT` and friends.
    ///
    /// Unknown or unset modes select the default transport.
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        let mode = lookup("MCP_TRANSPORT").unwrap_or_default();
        Self::from_mode(&mode, lookup).unwrap_or_default()
    }

    /// Select a transport by mode name: `stdio`, or `http` / `sse`.
    #[cfg_attr(not(feature = "http"), allow(unused_variables))]
    pub fn from_mode(mode: &str, lookup: Lookup<'_>) -> Result<Self> {
        match mode.trim().to_lowercase().as_str() {
            #[cfg(feature = "stdio")]
            "stdio" => Ok(Self::Stdio),
            #[cfg(feature = "http")]
            "http" | "sse" => Ok(Self::Http(HttpConfig::from_lookup(lookup))),
            other => Err(Error::config(format!(
                "Invalid transport mode '{}'. Available: {}",
                other,
                Self::available_modes().join(", ")
            ))),
        }
    }

    /// Mode names accepted by [`TransportConfig::from_mode`].
    pub fn available_modes() -> Vec<&'static str> {
        let mut modes = Vec::new();
        #[cfg(feature = "stdio")]
        modes.push("stdio");
        #[cfg(feature = "http")]
        modes.extend(["http", "sse"]);
        modes
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        match self {
            #[cfg(feature = "stdio")]
            Self::Stdio => "STDIO (line-framed)".to_string(),
            #[cfg(feature = "http")]
            Self::Http(cfg) => format!(
                "HTTP on {}:{} (API at {}, SSE streaming)",
                cfg.host,
                cfg.port,
                if cfg.api_prefix.is_empty() { "/" } else { cfg.api_prefix.as_str() }
            ),
        }
    }

    /// Check if this transport is the STDIO mode.
    pub fn is_stdio(&self) -> bool {
        #[cfg(feature = "stdio")]
        {
            matches!(self, Self::Stdio)
        }
        #[cfg(not(feature = "stdio"))]
        {
            false
        }
    }
}
