//! Tool server: the transport-facing handle on the dispatch core.
//!
//! A [`ToolServer`] owns the configuration, the tool registry and the backend
//! adapter. Every transport holds a clone and funnels requests through
//! [`ToolServer::dispatch`], so all three deliver identical semantics.
//!
//! ## Tool Architecture
//!
//! Tools are defined in `domains/tools/definitions/` with one file per tool.
//! The registry is built once here and never mutated afterwards.
//! **Adding a new tool does NOT require modifying this file!**

use chrono::Utc;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo, Tool};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::config::Config;
use super::error::Result;
use crate::domains::backend::{BackendAdapter, BackendConnector, RetryPolicy, SplunkConnector};
use crate::domains::tools::{
    Dispatcher, InvocationRequest, InvocationResult, ServerIdentity, ToolRegistry,
};

/// MCP protocol revision advertised to clients.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// The main server handle shared by all transports.
#[derive(Clone)]
pub struct ToolServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Dispatch core (registry + backend adapter).
    dispatcher: Arc<Dispatcher>,
}

impl ToolServer {
    /// Create a server talking to the Splunk instance described in `config`.
    pub fn new(config: Config) -> Result<Self> {
        let connector = SplunkConnector::new(&config.backend)?;
        Self::with_connector(config, Arc::new(connector))
    }

    /// Create a server over an arbitrary backend connector.
    pub fn with_connector(config: Config, connector: Arc<dyn BackendConnector>) -> Result<Self> {
        let registry = ToolRegistry::with_builtin_tools()?;
        info!("Registered {} tools", registry.len());

        let retry = RetryPolicy::new(
            Duration::from_millis(config.dispatch.retry_backoff_ms),
            Duration::from_millis(config.dispatch.retry_max_backoff_ms),
        );
        let identity = ServerIdentity {
            name: config.server.name.clone(),
            version: config.server.version.clone(),
        };
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(BackendAdapter::new(connector, retry)),
            identity,
            config.dispatch.deadline(),
        );

        Ok(Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }

    /// Run one invocation through the dispatch core.
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationResult {
        self.dispatcher.dispatch(request).await
    }

    /// Capability listing: name, description and parameters of every tool.
    pub fn list_tools(&self) -> Vec<Value> {
        self.registry().list().iter().map(|t| t.summary()).collect()
    }

    /// Every tool as an MCP tool definition.
    pub fn mcp_tools(&self) -> Vec<Tool> {
        self.registry().mcp_tools()
    }

    /// Process liveness, independent of backend reachability.
    pub fn liveness(&self) -> Value {
        json!({
            "status": "healthy",
            "server": self.name(),
            "version": self.version(),
            "tools": self.registry().len(),
            "timestamp": Utc::now().to_rfc3339(),
        })
    }

    /// Answer to an MCP `initialize` request.
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name().to_string(),
                version: self.version().to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Splunk tools: run searches, inspect indexes, users and saved searches, \
                 and manage KV store collections."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}
