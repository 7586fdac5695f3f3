//! User tools.
//!
//! - `current_user`: the principal the server is authenticated as
//! - `list_users`: every user (requires admin privileges)

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domains::backend::{BackendErrorKind, Entity, EntityKind};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, to_payload};

/// Normalized user record.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct UserInfo {
    pub username: String,
    pub real_name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub capabilities: Vec<String>,
    pub default_app: String,
    #[serde(rename = "type")]
    pub user_type: String,
}

impl From<&Entity> for UserInfo {
    fn from(user: &Entity) -> Self {
        Self {
            username: user.name.clone(),
            real_name: user.text_or("realname", "N/A"),
            email: user.text_or("email", "N/A"),
            roles: user.list("roles"),
            capabilities: user.list("capabilities"),
            default_app: user.text_or("defaultApp", "search"),
            user_type: user.text_or("type", "user"),
        }
    }
}

// ============================================================================
// current_user
// ============================================================================

/// Current user tool.
pub struct CurrentUserTool;

impl CurrentUserTool {
    pub const NAME: &'static str = "current_user";
    pub const DESCRIPTION: &'static str = "Get information about the currently authenticated user: \
        real name, email, roles, capabilities, default app and user type.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self)).output::<UserInfo>()
    }
}

#[async_trait]
impl ToolHandler for CurrentUserTool {
    #[instrument(skip_all, name = "current_user")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        let username = match ctx
            .backend
            .invoke("current_context", |session| async move {
                session.current_principal().await
            })
            .await
        {
            Ok(name) => {
                debug!("Using username from current context: {}", name);
                name
            }
            Err(e) if e.kind == BackendErrorKind::AuthFailure => return Err(e.into()),
            Err(e) => {
                let fallback = ctx.backend.info().username;
                warn!("Could not read current context ({}), using '{}'", e, fallback);
                fallback
            }
        };

        let name = username.as_str();
        let user = ctx
            .backend
            .invoke("get_user", |session| async move {
                session.get_entity(EntityKind::User, name).await
            })
            .await?;

        info!("Retrieved current user: {}", user.name);
        to_payload(&UserInfo::from(&user))
    }
}

// ============================================================================
// list_users
// ============================================================================

/// List users tool.
pub struct ListUsersTool;

impl ListUsersTool {
    pub const NAME: &'static str = "list_users";
    pub const DESCRIPTION: &'static str = "List all Splunk users (requires admin privileges).";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
    }
}

#[async_trait]
impl ToolHandler for ListUsersTool {
    #[instrument(skip_all, name = "list_users")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        let users = ctx
            .backend
            .invoke("list_users", |session| async move {
                session.list_entities(EntityKind::User).await
            })
            .await?;

        let users: Vec<UserInfo> = users.iter().map(UserInfo::from).collect();
        info!("Found {} users", users.len());
        to_payload(&users)
    }
}
