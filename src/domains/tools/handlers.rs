//! Tool handler contract.
//!
//! Handlers receive arguments that have already been validated against their
//! descriptor (defaults applied) and a [`ToolContext`] giving access to the
//! backend and to the registry itself.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::ToolError;
use super::registry::ToolRegistry;
use crate::domains::backend::BackendAdapter;

/// Result of running a handler.
pub type ToolOutcome = Result<Value, ToolError>;

/// Name and version the server reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
}

/// Everything a handler may use while running.
pub struct ToolContext<'a> {
    pub backend: &'a BackendAdapter,
    pub registry: &'a ToolRegistry,
    pub identity: &'a ServerIdentity,
}

/// Executable body of a tool.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with validated arguments.
    async fn call(&self, ctx: &ToolContext<'_>, args: Map<String, Value>) -> ToolOutcome;
}

/// Deserialize validated arguments into a typed parameter struct.
pub fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

/// Serialize a typed payload.
pub fn to_payload<T: Serialize>(payload: &T) -> ToolOutcome {
    serde_json::to_value(payload).map_err(|e| ToolError::internal(e.to_string()))
}
