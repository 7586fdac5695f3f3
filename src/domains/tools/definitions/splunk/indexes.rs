//! Index tools.
//!
//! - `list_indexes`: names of every index the user can see
//! - `get_index_info`: size and time bounds of one index
//! - `get_indexes_and_sourcetypes`: indexes plus per-index sourcetype counts

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domains::backend::{BackendResult, EntityKind, SearchRequest};
use crate::domains::tools::descriptor::{ParamSpec, ParamType, ToolDescriptor};
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, parse_args, to_payload};

async fn index_names(ctx: &ToolContext<'_>) -> BackendResult<Vec<String>> {
    let indexes = ctx
        .backend
        .invoke("list_indexes", |session| async move {
            session.list_entities(EntityKind::Index).await
        })
        .await?;
    Ok(indexes.into_iter().map(|i| i.name).collect())
}

// ============================================================================
// list_indexes
// ============================================================================

/// Names of the available indexes.
#[derive(Debug, Serialize, JsonSchema)]
pub struct IndexList {
    pub indexes: Vec<String>,
}

/// List indexes tool.
pub struct ListIndexesTool;

impl ListIndexesTool {
    pub const NAME: &'static str = "list_indexes";
    pub const DESCRIPTION: &'static str = "Get a list of all available Splunk indexes.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self)).output::<IndexList>()
    }
}

#[async_trait]
impl ToolHandler for ListIndexesTool {
    #[instrument(skip_all, name = "list_indexes")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        let indexes = index_names(ctx).await?;
        info!("Found {} indexes", indexes.len());
        to_payload(&IndexList { indexes })
    }
}

// ============================================================================
// get_index_info
// ============================================================================

#[derive(Debug, Deserialize)]
struct IndexInfoParams {
    index_name: String,
}

/// Metadata of a single index. Values are reported as the backend renders them.
#[derive(Debug, Serialize, JsonSchema)]
pub struct IndexInfo {
    pub name: String,
    pub total_event_count: String,
    pub current_size: String,
    pub max_size: String,
    pub min_time: String,
    pub max_time: String,
}

/// Index metadata tool.
pub struct GetIndexInfoTool;

impl GetIndexInfoTool {
    pub const NAME: &'static str = "get_index_info";
    pub const DESCRIPTION: &'static str = "Get metadata for a specific Splunk index.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
            .param(ParamSpec::required(
                "index_name",
                ParamType::String,
                "Name of the index to get metadata for",
            ))
            .output::<IndexInfo>()
    }
}

#[async_trait]
impl ToolHandler for GetIndexInfoTool {
    #[instrument(skip_all, name = "get_index_info")]
    async fn call(&self, ctx: &ToolContext<'_>, args: Map<String, Value>) -> ToolOutcome {
        let params: IndexInfoParams = parse_args(args)?;
        let name = params.index_name.as_str();

        let index = ctx
            .backend
            .invoke("get_index", |session| async move {
                session.get_entity(EntityKind::Index, name).await
            })
            .await?;

        let field = |key: &str| index.text(key).unwrap_or_default();
        to_payload(&IndexInfo {
            name: params.index_name.clone(),
            total_event_count: field("totalEventCount"),
            current_size: field("currentDBSizeMB"),
            max_size: field("maxTotalDataSizeMB"),
            min_time: field("minTime"),
            max_time: field("maxTime"),
        })
    }
}

// ============================================================================
// get_indexes_and_sourcetypes
// ============================================================================

const SOURCETYPE_QUERY: &str =
    "| tstats count WHERE index=* BY index, sourcetype | stats count BY index, sourcetype | sort - count";

/// Event count of one sourcetype within an index.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SourcetypeCount {
    pub sourcetype: String,
    pub count: String,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SourcetypeSummary {
    pub total_indexes: usize,
    pub total_sourcetypes: usize,
    pub search_time_range: String,
}

/// Indexes and the sourcetypes seen in each over the last 24 hours.
#[derive(Debug, Serialize, JsonSchema)]
pub struct IndexesAndSourcetypes {
    pub indexes: Vec<String>,
    pub sourcetypes: BTreeMap<String, Vec<SourcetypeCount>>,
    pub metadata: SourcetypeSummary,
}

/// Indexes and sourcetypes tool.
pub struct IndexesAndSourcetypesTool;

impl IndexesAndSourcetypesTool {
    pub const NAME: &'static str = "get_indexes_and_sourcetypes";
    pub const DESCRIPTION: &'static str = "Get a list of all indexes and the sourcetypes within each, \
        with event counts over the last 24 hours.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
            .output::<IndexesAndSourcetypes>()
    }
}

fn row_text(row: &Map<String, Value>, key: &str, fallback: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl ToolHandler for IndexesAndSourcetypesTool {
    #[instrument(skip_all, name = "get_indexes_and_sourcetypes")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        let indexes = index_names(ctx).await?;
        info!("Found {} indexes", indexes.len());

        let request = SearchRequest::new(SOURCETYPE_QUERY).with_time_range("-24h", "now");
        let rows = ctx
            .backend
            .invoke("sourcetype_search", |session| {
                let request = request.clone();
                async move { session.search(&request).await }
            })
            .await?;

        let mut sourcetypes: BTreeMap<String, Vec<SourcetypeCount>> = BTreeMap::new();
        for row in &rows {
            sourcetypes
                .entry(row_text(row, "index", ""))
                .or_default()
                .push(SourcetypeCount {
                    sourcetype: row_text(row, "sourcetype", ""),
                    count: row_text(row, "count", "0"),
                });
        }

        let metadata = SourcetypeSummary {
            total_indexes: indexes.len(),
            total_sourcetypes: sourcetypes.values().map(Vec::len).sum(),
            search_time_range: "24 hours".to_string(),
        };
        to_payload(&IndexesAndSourcetypes {
            indexes,
            sourcetypes,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::backend::testing::FakeBackend;
    use crate::domains::backend::{BackendErrorKind, Entity};
    use crate::domains::tools::definitions::testing::run;
    use crate::domains::tools::error::ToolError;
    use serde_json::json;

    #[tokio::test]
    async fn test_list_indexes() {
        let fake = FakeBackend::new().with_indexes(&["main", "_internal", "security"]);
        let payload = run(&fake, ListIndexesTool::descriptor(), json!({})).await.unwrap();
        assert_eq!(payload, json!({"indexes": ["main", "_internal", "security"]}));
    }

    #[tokio::test]
    async fn test_get_index_info() {
        let fake = FakeBackend::new().with_entities(
            EntityKind::Index,
            vec![
                Entity::new("main")
                    .with_field("totalEventCount", 1200)
                    .with_field("currentDBSizeMB", "12")
                    .with_field("maxTotalDataSizeMB", "500000")
                    .with_field("minTime", "2024-01-01T00:00:00+00:00")
                    .with_field("maxTime", "2024-02-01T00:00:00+00:00"),
            ],
        );
        let payload = run(&fake, GetIndexInfoTool::descriptor(), json!({"index_name": "main"}))
            .await
            .unwrap();

        assert_eq!(payload["name"], "main");
        assert_eq!(payload["total_event_count"], "1200");
        assert_eq!(payload["max_size"], "500000");
    }

    #[tokio::test]
    async fn test_get_index_info_unknown_index() {
        let fake = FakeBackend::new().with_indexes(&["main"]);
        let err = run(&fake, GetIndexInfoTool::descriptor(), json!({"index_name": "nope"}))
            .await
            .unwrap_err();
        let ToolError::Backend(err) = err else {
            panic!("expected backend error, got {err:?}");
        };
        assert_eq!(err.kind, BackendErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_sourcetypes_grouped_by_index() {
        let fake = FakeBackend::new()
            .with_indexes(&["main", "_internal"])
            .with_search_rows(vec![
                json!({"index": "_internal", "sourcetype": "splunkd", "count": "900"}),
                json!({"index": "main", "sourcetype": "access_combined", "count": "40"}),
                json!({"index": "_internal", "sourcetype": "scheduler", "count": "12"}),
            ]);
        let payload = run(&fake, IndexesAndSourcetypesTool::descriptor(), json!({}))
            .await
            .unwrap();

        assert_eq!(payload["indexes"], json!(["main", "_internal"]));
        assert_eq!(
            payload["sourcetypes"]["_internal"],
            json!([
                {"sourcetype": "splunkd", "count": "900"},
                {"sourcetype": "scheduler", "count": "12"}
            ])
        );
        assert_eq!(payload["metadata"]["total_indexes"], 2);
        assert_eq!(payload["metadata"]["total_sourcetypes"], 3);
        assert_eq!(fake.searches()[0].query, SOURCETYPE_QUERY);
    }
}
