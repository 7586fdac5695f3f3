//! Saved search listing tool.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domains::backend::EntityKind;
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, to_payload};

/// One saved search.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SavedSearch {
    pub name: String,
    pub description: String,
    pub search: String,
}

/// List saved searches tool.
pub struct ListSavedSearchesTool;

impl ListSavedSearchesTool {
    pub const NAME: &'static str = "list_saved_searches";
    pub const DESCRIPTION: &'static str =
        "List all saved searches with their names, descriptions and search queries.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
    }
}

#[async_trait]
impl ToolHandler for ListSavedSearchesTool {
    #[instrument(skip_all, name = "list_saved_searches")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        let entities = ctx
            .backend
            .invoke("list_saved_searches", |session| async move {
                session.list_entities(EntityKind::SavedSearch).await
            })
            .await?;

        let saved: Vec<SavedSearch> = entities
            .into_iter()
            .map(|e| SavedSearch {
                description: e.text("description").unwrap_or_default(),
                search: e.text("search").unwrap_or_default(),
                name: e.name,
            })
            .collect();

        info!("Found {} saved searches", saved.len());
        to_payload(&saved)
    }
}
