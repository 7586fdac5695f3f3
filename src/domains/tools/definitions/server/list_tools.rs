//! Tool listing tool.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::domains::tools::descriptor::{ParamSpec, ToolDescriptor};
use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome, to_payload};

#[derive(Debug, Serialize)]
struct ToolSummary<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a [ParamSpec],
}

/// Lists the registry contents without invoking any tool.
pub struct ListToolsTool;

impl ListToolsTool {
    pub const NAME: &'static str = "list_tools";
    pub const DESCRIPTION: &'static str =
        "List all available tools with their name, description and parameters.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(Self::NAME, Self::DESCRIPTION, Arc::new(Self))
    }
}

#[async_trait]
impl ToolHandler for ListToolsTool {
    #[instrument(skip_all, name = "list_tools")]
    async fn call(&self, ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
        let mut tools: Vec<ToolSummary<'_>> = ctx
            .registry
            .list()
            .iter()
            .map(|t| ToolSummary {
                name: t.name(),
                description: t.description(),
                parameters: t.parameters(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(b.name));

        info!("Found {} tools", tools.len());
        to_payload(&tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::backend::testing::FakeBackend;
    use crate::domains::tools::definitions::testing::run;
    use serde_json::json;

    #[tokio::test]
    async fn test_tools_sorted_by_name() {
        let fake = FakeBackend::new();
        let payload = run(&fake, ListToolsTool::descriptor(), json!({})).await.unwrap();

        let names: Vec<_> = payload
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.iter().any(|n| n == "search"));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_parameters_are_listed() {
        let payload = run(&FakeBackend::new(), ListToolsTool::descriptor(), json!({}))
            .await
            .unwrap();
        let search = payload
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "search")
            .unwrap();

        assert_eq!(
            search["parameters"][0],
            json!({
                "name": "search_query",
                "type": "string",
                "required": true,
                "description": "The search query to execute"
            })
        );
        assert_eq!(search["parameters"][3]["default"], 100);
    }
}
