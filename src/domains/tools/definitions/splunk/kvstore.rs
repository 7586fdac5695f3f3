//! KV store collection tools.
//!
//! - `list_kvstore_collections`: collections across apps, with record counts
//! - `create_kvstore_collection`: create a collection in an app
//! - `delete_kvstore_collection`: delete a collection from an app

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domains::backend::{Entity, EntityKind};
use crate::domains::tools::descriptor::{ParamSpec, ParamType, ToolDescriptor};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, parse_args, to_payload};

const FIELD_PREFIX: &str = "field.";
const ACCELERATED_PREFIX: &str = "accelerated_field.";
const DEFAULT_APP: &str = "search";

/// A KV store collection and its schema.
#[derive(Debug, Serialize, JsonSchema)]
pub struct KvStoreCollection {
    pub name: String,
    pub app: String,
    pub fields: Vec<String>,
    pub accelerated_fields: Vec<String>,
    pub record_count: u64,
}

impl KvStoreCollection {
    fn from_entity(entity: &Entity, stats: &HashMap<String, u64>) -> Self {
        let app = entity.app.clone().unwrap_or_else(|| DEFAULT_APP.to_string());
        let mut fields = entity.prefixed_keys(FIELD_PREFIX);
        fields.sort();
        let mut accelerated_fields = entity.prefixed_keys(ACCELERATED_PREFIX);
        accelerated_fields.sort();
        Self {
            record_count: stats
                .get(&format!("{}.{}", app, entity.name))
                .copied()
                .unwrap_or(0),
            name: entity.name.clone(),
            app,
            fields,
            accelerated_fields,
        }
    }
}

// ============================================================================
// list_kvstore_collections
// ============================================================================

/// List KV store collections tool.
pub struct ListKvStoreCollectionsTool;

impl ListKvStoreCollectionsTool {
    pub const NAME: &'static str = "list_kvstore_collections";
    pub const DESCRIPTION: &'static str = "List all KV store collections across apps, \
        including fields, accelerated fields and record counts.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
    }
}

#[async_trait]
impl ToolHandler for ListKvStoreCollectionsTool {
    #[instrument(skip_all, name = "list_kvstore_collections")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        // Record counts are best effort; introspection is often disabled.
        let stats = ctx
            .backend
            .invoke("kvstore_stats", |session| async move {
                session.collection_stats().await
            })
            .await
            .unwrap_or_else(|e| {
                warn!("Could not retrieve KV store collection stats: {}", e);
                HashMap::new()
            });

        let entities = ctx
            .backend
            .invoke("list_kvstore_collections", |session| async move {
                session.list_entities(EntityKind::KvStoreCollection).await
            })
            .await?;

        let collections: Vec<KvStoreCollection> = entities
            .iter()
            .map(|e| KvStoreCollection::from_entity(e, &stats))
            .collect();
        info!("Found {} KV store collections", collections.len());
        to_payload(&collections)
    }
}

// ============================================================================
// create_kvstore_collection
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateParams {
    collection_name: String,
    app_name: String,
    #[serde(default)]
    fields: Option<Map<String, Value>>,
}

/// Create KV store collection tool.
pub struct CreateKvStoreCollectionTool;

impl CreateKvStoreCollectionTool {
    pub const NAME: &'static str = "create_kvstore_collection";
    pub const DESCRIPTION: &'static str = "Create a new KV store collection. \
        Fields map field names to types (string, number, bool, time, array, cidr).";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
            .param(ParamSpec::required(
                "collection_name",
                ParamType::String,
                "Name of the collection to create",
            ))
            .param(ParamSpec::optional(
                "app_name",
                ParamType::String,
                Some(json!(DEFAULT_APP)),
                "App to create the collection in",
            ))
            .param(ParamSpec::optional(
                "fields",
                ParamType::Object,
                None,
                "Field definitions, name to type",
            ))
            .output::<KvStoreCollection>()
    }
}

#[async_trait]
impl ToolHandler for CreateKvStoreCollectionTool {
    #[instrument(skip_all, name = "create_kvstore_collection")]
    async fn call(&self, ctx: &ToolContext<'_>, args: Map<String, Value>) -> ToolOutcome {
        let params: CreateParams = parse_args(args)?;
        if params.collection_name.trim().is_empty() {
            return Err(ToolError::invalid_arguments("Collection name cannot be empty"));
        }

        let mut attributes = Map::new();
        for (field, field_type) in params.fields.unwrap_or_default() {
            let Value::String(field_type) = field_type else {
                return Err(ToolError::invalid_arguments(format!(
                    "Type of field '{}' must be a string",
                    field
                )));
            };
            attributes.insert(format!("{FIELD_PREFIX}{field}"), Value::String(field_type));
        }

        let (app, name, attributes) = (&params.app_name, &params.collection_name, &attributes);
        let created = ctx
            .backend
            .invoke_once("create_kvstore_collection", |session| async move {
                session
                    .create_entity(EntityKind::KvStoreCollection, app, name, attributes)
                    .await
            })
            .await?;

        info!("Created KV store collection {}/{}", app, name);
        let mut collection = KvStoreCollection::from_entity(&created, &HashMap::new());
        // The backend does not always echo the namespace it created in.
        collection.app = params.app_name.clone();
        to_payload(&collection)
    }
}

// ============================================================================
// delete_kvstore_collection
// ============================================================================

#[derive(Debug, Deserialize)]
struct DeleteParams {
    collection_name: String,
    app_name: String,
}

/// Confirmation of a deletion.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Deleted {
    pub deleted: bool,
    pub name: String,
    pub app: String,
}

/// Delete KV store collection tool.
pub struct DeleteKvStoreCollectionTool;

impl DeleteKvStoreCollectionTool {
    pub const NAME: &'static str = "delete_kvstore_collection";
    pub const DESCRIPTION: &'static str = "Delete a KV store collection and all of its records.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
            .param(ParamSpec::required(
                "collection_name",
                ParamType::String,
                "Name of the collection to delete",
            ))
            .param(ParamSpec::optional(
                "app_name",
                ParamType::String,
                Some(json!(DEFAULT_APP)),
                "App the collection belongs to",
            ))
            .output::<Deleted>()
    }
}

#[async_trait]
impl ToolHandler for DeleteKvStoreCollectionTool {
    #[instrument(skip_all, name = "delete_kvstore_collection")]
    async fn call(&self, ctx: &ToolContext<'_>, args: Map<String, Value>) -> ToolOutcome {
        let params: DeleteParams = parse_args(args)?;
        let (app, name) = (params.app_name.as_str(), params.collection_name.as_str());

        ctx.backend
            .invoke_once("delete_kvstore_collection", |session| async move {
                session
                    .delete_entity(EntityKind::KvStoreCollection, app, name)
                    .await
            })
            .await?;

        info!("Deleted KV store collection {}/{}", app, name);
        to_payload(&Deleted {
            deleted: true,
            name: params.collection_name.clone(),
            app: params.app_name.clone(),
        })
    }
}
