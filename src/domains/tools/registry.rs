//! Tool Registry - central registration and lookup for all tools.
//!
//! The registry is built once at startup and then shared read-only (behind an
//! `Arc`) by every transport. Registration order is preserved for listings.

use std::collections::HashMap;

use rmcp::model::Tool;
use tracing::debug;

use super::definitions;
use super::descriptor::ToolDescriptor;
use super::error::RegistryError;

/// Catalog of available tools.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in tool.
    pub fn with_builtin_tools() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in definitions::all() {
            registry.register(descriptor)?;
        }
        debug!("Registered {} tools", registry.len());
        Ok(registry)
    }

    /// Add a tool. Names must be unique.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.by_name.contains_key(descriptor.name()) {
            return Err(RegistryError::DuplicateTool(descriptor.name().to_string()));
        }
        self.by_name
            .insert(descriptor.name().to_string(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Look up a tool by name.
    pub fn resolve(&self, name: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(name).and_then(|&i| self.tools.get(i))
    }

    /// All tools, in registration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// All tool names, in registration order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// All tools as MCP tool definitions.
    pub fn mcp_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDescriptor::to_tool).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::handlers::{ToolContext, ToolHandler, ToolOutcome};
    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl ToolHandler for Noop {
        async fn call(&self, _ctx: &ToolContext<'_>, _args: Map<String, Value>) -> ToolOutcome {
            Ok(Value::Null)
        }
    }

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, format!("The {name} tool"), Arc::new(Noop))
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry = ToolRegistry::new();
        registry.register(tool("ping")).unwrap();

        let err = registry.register(tool("ping")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("ping".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_returns_matching_descriptor() {
        let mut registry = ToolRegistry::new();
        for name in ["a", "b", "c"] {
            registry.register(tool(name)).unwrap();
        }

        for name in ["a", "b", "c"] {
            let descriptor = registry.resolve(name).unwrap();
            assert_eq!(descriptor.name(), name);
            assert_eq!(descriptor.description(), format!("The {name} tool"));
        }
        assert!(registry.resolve("d").is_none());
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(tool(name)).unwrap();
        }
        assert_eq!(registry.tool_names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_builtin_tools() {
        let registry = ToolRegistry::with_builtin_tools().unwrap();
        let names = registry.tool_names();
        assert_eq!(names.len(), 14);
        for expected in [
            "search",
            "list_indexes",
            "get_index_info",
            "get_indexes_and_sourcetypes",
            "list_saved_searches",
            "current_user",
            "list_users",
            "list_kvstore_collections",
            "create_kvstore_collection",
            "delete_kvstore_collection",
            "health_check",
            "health",
            "list_tools",
            "ping",
        ] {
            assert!(names.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn test_builtin_tools_render_as_mcp_tools() {
        let registry = ToolRegistry::with_builtin_tools().unwrap();
        let tools = registry.mcp_tools();
        assert_eq!(tools.len(), registry.len());
        assert!(tools.iter().all(|t| t.input_schema.get("type").is_some()));
    }
}
