//! Data shapes exchanged with the backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kinds of named entities the backend manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Index,
    SavedSearch,
    KvStoreCollection,
    App,
    /// Users (principals) known to the backend.
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::SavedSearch => "saved_search",
            Self::KvStoreCollection => "kvstore_collection",
            Self::App => "app",
            Self::User => "user",
        }
    }
}

/// A named entity as returned by the backend.
///
/// `content` holds the entity's attributes verbatim; accessors normalize the
/// loosely-typed values the backend tends to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub content: Map<String, Value>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.content.insert(key.into(), value.into());
        self
    }

    /// Get a field rendered as a string. Missing and null fields yield `None`.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.content.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Get a non-empty string field, or the fallback.
    pub fn text_or(&self, key: &str, fallback: &str) -> String {
        self.text(key)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Get a field as a list of strings.
    ///
    /// A bare string becomes a one-element list; null or missing becomes empty.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.content.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Names of fields sharing `prefix`, with the prefix stripped.
    pub fn prefixed_keys(&self, prefix: &str) -> Vec<String> {
        self.content
            .keys()
            .filter_map(|k| k.strip_prefix(prefix))
            .map(str::to_string)
            .collect()
    }
}

/// A search job request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub earliest_time: String,
    pub latest_time: String,
    /// Maximum number of result rows; `None` means backend default.
    pub max_results: Option<u64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            earliest_time: "-24h".to_string(),
            latest_time: "now".to_string(),
            max_results: None,
        }
    }

    pub fn with_time_range(mut self, earliest: impl Into<String>, latest: impl Into<String>) -> Self {
        self.earliest_time = earliest.into();
        self.latest_time = latest.into();
        self
    }

    pub fn with_max_results(mut self, max_results: u64) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// A single search result row.
pub type SearchRow = Map<String, Value>;

/// Where the backend lives and who we are connecting as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub username: String,
    pub ssl_verify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_normalizes_strings_and_nulls() {
        let entity = Entity::new("admin")
            .with_field("roles", "admin")
            .with_field("capabilities", Value::Null)
            .with_field("apps", json!(["search", "launcher"]));

        assert_eq!(entity.list("roles"), vec!["admin"]);
        assert!(entity.list("capabilities").is_empty());
        assert!(entity.list("missing").is_empty());
        assert_eq!(entity.list("apps"), vec!["search", "launcher"]);
    }

    #[test]
    fn test_text_renders_numbers() {
        let entity = Entity::new("main")
            .with_field("totalEventCount", 42)
            .with_field("realname", "");

        assert_eq!(entity.text("totalEventCount").as_deref(), Some("42"));
        assert_eq!(entity.text_or("realname", "N/A"), "N/A");
        assert_eq!(entity.text_or("email", "N/A"), "N/A");
    }

    #[test]
    fn test_prefixed_keys() {
        let entity = Entity::new("users")
            .with_field("field.name", "string")
            .with_field("field.age", "number")
            .with_field("accelerated_field.by_name", "{\"name\": 1}")
            .with_field("disabled", false);

        let mut fields = entity.prefixed_keys("field.");
        fields.sort();
        assert_eq!(fields, vec!["age", "name"]);
        assert_eq!(entity.prefixed_keys("accelerated_field."), vec!["by_name"]);
    }
}
