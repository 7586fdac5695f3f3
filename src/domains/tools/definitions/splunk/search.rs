//! Search tool definition.
//!
//! Runs a one-shot search job and returns its result rows.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domains::backend::SearchRequest;
use crate::domains::tools::descriptor::{ParamSpec, ParamType, ToolDescriptor};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, parse_args, to_payload};

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the search tool.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub search_query: String,
    pub earliest_time: String,
    pub latest_time: String,
    pub max_results: u64,
}

// ============================================================================
// Output Structure
// ============================================================================

/// Rows returned by a search.
#[derive(Debug, Serialize, JsonSchema)]
pub struct SearchOutput {
    /// Result rows, one object per event or statistics row.
    pub results: Vec<Map<String, Value>>,
    /// Number of rows returned.
    pub count: usize,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// Search tool - executes a search query.
pub struct SearchTool;

impl SearchTool {
    /// Tool name as registered in the catalog.
    pub const NAME: &'static str = "search";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Execute a Splunk search query and return the results. \
        Queries that do not start with 'search' or '|' are treated as plain searches.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
            .param(ParamSpec::required(
                "search_query",
                ParamType::String,
                "The search query to execute",
            ))
            .param(ParamSpec::optional(
                "earliest_time",
                ParamType::String,
                Some(json!("-24h")),
                "Start time for the search",
            ))
            .param(ParamSpec::optional(
                "latest_time",
                ParamType::String,
                Some(json!("now")),
                "End time for the search",
            ))
            .param(ParamSpec::optional(
                "max_results",
                ParamType::Integer,
                Some(json!(100)),
                "Maximum number of results to return",
            ))
            .output::<SearchOutput>()
    }
}

#[async_trait]
impl ToolHandler for SearchTool {
    #[instrument(skip_all, name = "search")]
    async fn call(&self, ctx: &ToolContext<'_>, args: Map<String, Value>) -> ToolOutcome {
        let params: SearchParams = parse_args(args)?;
        if params.search_query.trim().is_empty() {
            return Err(ToolError::invalid_arguments("Search query cannot be empty"));
        }

        info!("Executing search: {}", params.search_query);
        let request = SearchRequest::new(params.search_query)
            .with_time_range(params.earliest_time, params.latest_time)
            .with_max_results(params.max_results);

        let results = ctx
            .backend
            .invoke("search", |session| {
                let request = request.clone();
                async move { session.search(&request).await }
            })
            .await?;

        info!("Search returned {} rows", results.len());
        to_payload(&SearchOutput {
            count: results.len(),
            results,
        })
    }
}
