//! Ping tool: liveness without touching the backend.

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, to_payload};

#[derive(Debug, Serialize, JsonSchema)]
pub struct Pong {
    pub status: String,
    pub server: String,
    pub version: String,
    /// RFC 3339 server time.
    pub timestamp: String,
    pub protocol: String,
    pub capabilities: Vec<String>,
}

/// Ping tool.
pub struct PingTool;

impl PingTool {
    pub const NAME: &'static str = "ping";
    pub const DESCRIPTION: &'static str =
        "Check server availability and get basic server information. Does not contact Splunk.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self)).output::<Pong>()
    }
}

#[async_trait]
impl ToolHandler for PingTool {
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        to_payload(&Pong {
            status: "ok".to_string(),
            server: ctx.identity.name.clone(),
            version: ctx.identity.version.clone(),
            timestamp: Utc::now().to_rfc3339(),
            protocol: "mcp".to_string(),
            capabilities: vec!["splunk".to_string()],
        })
    }
}
