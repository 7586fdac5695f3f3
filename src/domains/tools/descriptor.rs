//! Tool descriptors and argument validation.
//!
//! A [`ToolDescriptor`] pairs a tool's metadata with its handler. The ordered
//! parameter list is the single source for argument validation, the MCP
//! `inputSchema` and the capability listing.

use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::handlers::ToolHandler;

/// JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Whether `value` is acceptable for this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: true,
            default: None,
            description: description.to_string(),
        }
    }

    /// An optional parameter; `default` is applied when the argument is absent.
    pub fn optional(
        name: &str,
        param_type: ParamType,
        default: Option<Value>,
        description: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            required: false,
            default,
            description: description.to_string(),
        }
    }
}

/// Argument validation failure listing every offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub problems: Vec<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.problems.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// A registered tool: metadata plus handler.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParamSpec>,
    output_schema: Option<Arc<JsonObject>>,
    handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            output_schema: None,
            handler,
        }
    }

    /// Append a parameter. Declaration order is preserved in listings.
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    /// Advertise the payload schema of `T`.
    pub fn output<T: JsonSchema + 'static>(mut self) -> Self {
        self.output_schema = Some(cached_schema_for_type::<T>());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Check `arguments` against the declared parameters.
    ///
    /// Returns the arguments with defaults filled in. A null value counts as
    /// absent. Undeclared arguments are dropped.
    pub fn validate(&self, mut arguments: Map<String, Value>) -> Result<Map<String, Value>, ValidationError> {
        let mut problems = Vec::new();
        let mut validated = Map::new();

        for spec in &self.parameters {
            match arguments.remove(&spec.name) {
                Some(Value::Null) | None => {
                    if spec.required {
                        problems.push(format!("missing required argument: {}", spec.name));
                    } else if let Some(default) = &spec.default {
                        validated.insert(spec.name.clone(), default.clone());
                    }
                }
                Some(value) if spec.param_type.accepts(&value) => {
                    validated.insert(spec.name.clone(), value);
                }
                Some(value) => problems.push(format!(
                    "argument {} must be {}, got {}",
                    spec.name,
                    spec.param_type.as_str(),
                    json_type_name(&value)
                )),
            }
        }

        if !arguments.is_empty() {
            let ignored: Vec<_> = arguments.keys().collect();
            debug!(tool = %self.name, ?ignored, "Ignoring undeclared arguments");
        }

        if problems.is_empty() {
            Ok(validated)
        } else {
            Err(ValidationError { problems })
        }
    }

    /// JSON Schema of the arguments object.
    pub fn input_schema(&self) -> JsonObject {
        let mut properties = Map::new();
        for spec in &self.parameters {
            let mut property = Map::new();
            property.insert("type".into(), json!(spec.param_type.as_str()));
            property.insert("description".into(), json!(spec.description));
            if let Some(default) = &spec.default {
                property.insert("default".into(), default.clone());
            }
            properties.insert(spec.name.clone(), Value::Object(property));
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), json!(required));
        schema
    }

    /// Render as an MCP tool definition.
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone().into(),
            description: Some(self.description.clone().into()),
            input_schema: Arc::new(self.input_schema()),
            annotations: None,
            output_schema: self.output_schema.clone(),
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Capability-listing entry: name, description and ordered parameters.
    pub fn summary(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters,
            "inputSchema": self.input_schema(),
        })
    }
}
