//! Health check tool.
//!
//! Registered twice, as `health_check` and `health`, sharing one handler.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domains::backend::{ConnectionInfo, EntityKind};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, to_payload};

#[derive(Debug, Serialize, JsonSchema)]
pub struct AppInfo {
    pub name: String,
    pub label: String,
    pub version: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ConnectionSummary {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub username: String,
    pub ssl_verify: bool,
}

impl From<ConnectionInfo> for ConnectionSummary {
    fn from(info: ConnectionInfo) -> Self {
        Self {
            host: info.host,
            port: info.port,
            scheme: info.scheme,
            username: info.username,
            ssl_verify: info.ssl_verify,
        }
    }
}

/// Backend connection summary and installed apps.
#[derive(Debug, Serialize, JsonSchema)]
pub struct HealthReport {
    pub status: String,
    pub connection: ConnectionSummary,
    pub apps_count: usize,
    pub apps: Vec<AppInfo>,
}

/// Health check tool.
pub struct HealthCheckTool;

impl HealthCheckTool {
    pub const NAME: &'static str = "health_check";
    pub const ALIAS: &'static str = "health";
    pub const DESCRIPTION: &'static str =
        "Get basic Splunk connection information and list available apps.";
    pub const ALIAS_DESCRIPTION: &'static str =
        "Get basic Splunk connection information and list available apps (same as health_check).";

    /// Descriptors for `health_check` and its `health` alias.
    pub fn descriptors() -> [ToolDescriptor; 2] {
        let handler: Arc<dyn ToolHandler> = Arc::new(Self);
        [
            ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, handler.clone())
                .output::<HealthReport>(),
            ToolDescriptor::new(Self::ALIAS, Self::ALIAS_DESCRIPTION, handler)
                .output::<HealthReport>(),
        ]
    }
}

#[async_trait]
impl ToolHandler for HealthCheckTool {
    #[instrument(skip_all, name = "health_check")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        let apps = ctx
            .backend
            .invoke("list_apps", |session| async move {
                session.list_entities(EntityKind::App).await
            })
            .await?;

        let apps: Vec<AppInfo> = apps
            .into_iter()
            .map(|app| AppInfo {
                label: app.text_or("label", &app.name),
                version: app.text("version").unwrap_or_default(),
                name: app.name,
            })
            .collect();

        info!("Health check successful, {} apps", apps.len());
        to_payload(&HealthReport {
            status: "healthy".to_string(),
            connection: ctx.backend.info().into(),
            apps_count: apps.len(),
            apps,
        })
    }
}
