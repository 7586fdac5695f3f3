//! Splunk REST implementation of the backend traits.
//!
//! Talks to the Splunk management port with `output_mode=json`. Sessions are
//! cheap handles over a shared, connection-pooling `reqwest::Client`; each
//! call builds its own request, so concurrent calls never share state.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::error::{BackendError, BackendResult};
use super::model::{ConnectionInfo, Entity, EntityKind, SearchRequest, SearchRow};
use super::session::{BackendConnector, BackendSession};
use crate::core::config::BackendConfig;

/// Namespace used when creating app-scoped entities.
const SHARED_OWNER: &str = "nobody";

/// Connector producing sessions against a Splunk instance.
pub struct SplunkConnector {
    session: Arc<SplunkSession>,
    info: ConnectionInfo,
}

struct SplunkSession {
    client: Client,
    base: Url,
    auth: Auth,
}

enum Auth {
    Basic { username: String, password: String },
    Token(String),
}

impl SplunkConnector {
    /// Build a connector from configuration.
    ///
    /// Fails with `InvalidArgument` when the endpoint cannot form a URL and
    /// `ConnectionFailure` when the HTTP client cannot be initialised.
    pub fn new(config: &BackendConfig) -> BackendResult<Self> {
        let base = Url::parse(&format!(
            "{}://{}:{}/",
            config.scheme, config.host, config.port
        ))
        .map_err(|e| BackendError::invalid_argument(format!("Invalid Splunk endpoint: {}", e)))?;

        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BackendError::connection(format!("Failed to build HTTP client: {}", e)))?;

        let auth = match &config.token {
            Some(token) => Auth::Token(token.clone()),
            None => Auth::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            },
        };

        let info = ConnectionInfo {
            host: config.host.clone(),
            port: config.port,
            scheme: config.scheme.clone(),
            username: config.username.clone(),
            ssl_verify: config.verify_tls,
        };

        Ok(Self {
            session: Arc::new(SplunkSession { client, base, auth }),
            info,
        })
    }
}

#[async_trait]
impl BackendConnector for SplunkConnector {
    async fn connect(&self) -> BackendResult<Arc<dyn BackendSession>> {
        debug!(
            "Connecting to Splunk at {}://{}:{} as {}",
            self.info.scheme, self.info.host, self.info.port, self.info.username
        );
        Ok(self.session.clone())
    }

    fn info(&self) -> ConnectionInfo {
        self.info.clone()
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    name: String,
    #[serde(default)]
    acl: Option<Acl>,
    #[serde(default)]
    content: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct Acl {
    #[serde(default)]
    app: Option<String>,
    #[serde(default)]
    owner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<SearchRow>,
}

impl From<FeedEntry> for Entity {
    fn from(entry: FeedEntry) -> Self {
        let (app, owner) = entry
            .acl
            .map(|acl| (acl.app, acl.owner))
            .unwrap_or_default();
        Entity {
            name: entry.name,
            app,
            owner,
            content: entry.content,
        }
    }
}

/// Path segments of the collection endpoint for `kind`.
fn collection_path(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Index => &["services", "data", "indexes"],
        EntityKind::SavedSearch => &["services", "saved", "searches"],
        EntityKind::KvStoreCollection => &["servicesNS", "-", "-", "storage", "collections", "config"],
        EntityKind::App => &["services", "apps", "local"],
        EntityKind::User => &["services", "authentication", "users"],
    }
}

/// Path segments of the app-scoped collection endpoint for `kind`.
fn namespaced_path(kind: EntityKind, app: &str) -> Vec<String> {
    let tail = collection_path(kind);
    // Drop the global namespace prefix: `services` or `servicesNS/-/-`.
    let skip = if tail.first() == Some(&"servicesNS") { 3 } else { 1 };
    let mut segments = vec!["servicesNS".to_string(), SHARED_OWNER.to_string(), app.to_string()];
    segments.extend(tail.iter().skip(skip).map(|s| s.to_string()));
    segments
}

/// Splunk rejects searches that do not start with a generating command.
fn normalize_query(query: &str) -> String {
    let trimmed = query.trim_start();
    if trimmed.starts_with('|') || trimmed.starts_with("search ") {
        trimmed.to_string()
    } else {
        format!("search {}", trimmed)
    }
}

/// Map an HTTP status to a backend failure kind.
fn error_for_status(status: StatusCode, message: String) -> BackendError {
    match status {
        StatusCode::UNAUTHORIZED => BackendError::auth(message),
        StatusCode::FORBIDDEN => BackendError::permission_denied(message),
        StatusCode::NOT_FOUND => BackendError::not_found(message),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT => BackendError::invalid_argument(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendError::timeout(message),
        _ => BackendError::unavailable(message),
    }
}

fn error_for_transport(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::timeout(err.to_string())
    } else if err.is_connect() {
        BackendError::connection(err.to_string())
    } else {
        BackendError::unavailable(err.to_string())
    }
}

/// Extract the `messages[].text` Splunk attaches to error bodies.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let texts: Vec<&str> = value
        .get("messages")?
        .as_array()?
        .iter()
        .filter_map(|m| m.get("text").and_then(Value::as_str))
        .collect();
    (!texts.is_empty()).then(|| texts.join("; "))
}

/// Parse the collectionstats introspection payload into `ns -> count`.
fn parse_collection_stats(feed: Feed) -> HashMap<String, u64> {
    let mut stats = HashMap::new();
    let Some(entry) = feed.entry.into_iter().next() else {
        return stats;
    };
    let Some(data) = entry.content.get("data").and_then(Value::as_array) else {
        return stats;
    };
    for raw in data {
        // Each element is itself a JSON document serialized as a string.
        let parsed = match raw {
            Value::String(s) => serde_json::from_str::<Value>(s).ok(),
            other => Some(other.clone()),
        };
        let Some(doc) = parsed else { continue };
        if let (Some(ns), Some(count)) = (
            doc.get("ns").and_then(Value::as_str),
            doc.get("count").and_then(Value::as_u64),
        ) {
            stats.insert(ns.to_string(), count);
        }
    }
    stats
}

// ============================================================================
// Requests
// ============================================================================

impl SplunkSession {
    fn url<S: AsRef<str>>(&self, segments: &[S]) -> BackendResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::invalid_argument("Splunk endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments.iter().map(|s| s.as_ref()));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .query(&[("output_mode", "json")]);
        match &self.auth {
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Token(token) => builder.bearer_auth(token),
        }
    }

    async fn send(&self, builder: RequestBuilder) -> BackendResult<Response> {
        let response = builder.send().await.map_err(error_for_transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| format!("Splunk returned {}", status));
        Err(error_for_status(status, message))
    }

    async fn feed(&self, builder: RequestBuilder) -> BackendResult<Feed> {
        self.send(builder)
            .await?
            .json::<Feed>()
            .await
            .map_err(|e| BackendError::unavailable(format!("Malformed Splunk response: {}", e)))
    }
}

#[async_trait]
impl BackendSession for SplunkSession {
    #[instrument(skip_all, fields(query = %request.query))]
    async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<SearchRow>> {
        let url = self.url(&["services", "search", "jobs"])?;
        let mut form = vec![
            ("search", normalize_query(&request.query)),
            ("exec_mode", "oneshot".to_string()),
            ("earliest_time", request.earliest_time.clone()),
            ("latest_time", request.latest_time.clone()),
            ("output_mode", "json".to_string()),
        ];
        if let Some(max) = request.max_results {
            form.push(("count", max.to_string()));
        }

        let results = self
            .send(self.request(Method::POST, url).form(&form))
            .await?
            .json::<SearchResults>()
            .await
            .map_err(|e| BackendError::unavailable(format!("Malformed search results: {}", e)))?;
        debug!("Search returned {} rows", results.results.len());
        Ok(results.results)
    }

    async fn list_entities(&self, kind: EntityKind) -> BackendResult<Vec<Entity>> {
        let url = self.url(collection_path(kind))?;
        let feed = self
            .feed(self.request(Method::GET, url).query(&[("count", "0")]))
            .await?;
        Ok(feed.entry.into_iter().map(Entity::from).collect())
    }

    async fn get_entity(&self, kind: EntityKind, name: &str) -> BackendResult<Entity> {
        let mut segments: Vec<&str> = collection_path(kind).to_vec();
        segments.push(name);
        let url = self.url(&segments)?;
        self.feed(self.request(Method::GET, url))
            .await?
            .entry
            .into_iter()
            .next()
            .map(Entity::from)
            .ok_or_else(|| BackendError::not_found(format!("{} not found: {}", kind.as_str(), name)))
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        app: &str,
        name: &str,
        attributes: &Map<String, Value>,
    ) -> BackendResult<Entity> {
        let url = self.url(&namespaced_path(kind, app))?;
        let mut form = vec![("name".to_string(), name.to_string())];
        for (key, value) in attributes {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form.push((key.clone(), value));
        }

        let feed = self.feed(self.request(Method::POST, url).form(&form)).await?;
        Ok(feed
            .entry
            .into_iter()
            .next()
            .map(Entity::from)
            .unwrap_or_else(|| Entity::new(name).with_app(app)))
    }

    async fn delete_entity(&self, kind: EntityKind, app: &str, name: &str) -> BackendResult<()> {
        let mut segments = namespaced_path(kind, app);
        segments.push(name.to_string());
        let url = self.url(&segments)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn current_principal(&self) -> BackendResult<String> {
        let url = self.url(&["services", "authentication", "current-context"])?;
        let feed = self.feed(self.request(Method::GET, url)).await?;
        feed.entry
            .into_iter()
            .next()
            .and_then(|e| {
                e.content
                    .get("username")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .ok_or_else(|| BackendError::not_found("Current context has no username"))
    }

    async fn collection_stats(&self) -> BackendResult<HashMap<String, u64>> {
        let url = self.url(&["services", "server", "introspection", "kvstore", "collectionstats"])?;
        let feed = self.feed(self.request(Method::GET, url)).await?;
        let stats = parse_collection_stats(feed);
        if stats.is_empty() {
            warn!("KV store collection stats were empty");
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> BackendConfig {
        BackendConfig::default()
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("index=_internal | head 5"), "search index=_internal | head 5");
        assert_eq!(normalize_query("search index=main"), "search index=main");
        assert_eq!(normalize_query("  | tstats count"), "| tstats count");
    }

    #[test]
    fn test_status_mapping() {
        use crate::domains::backend::BackendErrorKind as K;
        let cases = [
            (StatusCode::UNAUTHORIZED, K::AuthFailure),
            (StatusCode::FORBIDDEN, K::PermissionDenied),
            (StatusCode::NOT_FOUND, K::NotFound),
            (StatusCode::BAD_REQUEST, K::InvalidArgument),
            (StatusCode::CONFLICT, K::InvalidArgument),
            (StatusCode::GATEWAY_TIMEOUT, K::Timeout),
            (StatusCode::SERVICE_UNAVAILABLE, K::Unavailable),
            (StatusCode::INTERNAL_SERVER_ERROR, K::Unavailable),
        ];
        for (status, kind) in cases {
            assert_eq!(error_for_status(status, String::new()).kind, kind, "{status}");
        }
    }

    #[test]
    fn test_error_message_joins_splunk_messages() {
        let body = r#"{"messages":[{"type":"ERROR","text":"Unknown search command 'invalid'."}]}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("Unknown search command 'invalid'.")
        );
        assert_eq!(error_message("<html/>"), None);
    }

    #[test]
    fn test_feed_entry_into_entity() {
        let feed: Feed = serde_json::from_value(json!({
            "entry": [{
                "name": "users",
                "acl": {"app": "search", "owner": "nobody"},
                "content": {"field.name": "string"}
            }]
        }))
        .unwrap();

        let entity: Entity = feed.entry.into_iter().next().unwrap().into();
        assert_eq!(entity.name, "users");
        assert_eq!(entity.app.as_deref(), Some("search"));
        assert_eq!(entity.prefixed_keys("field."), vec!["name"]);
    }

    #[test]
    fn test_parse_collection_stats() {
        let feed: Feed = serde_json::from_value(json!({
            "entry": [{
                "name": "collectionstats",
                "content": {
                    "data": [
                        "{\"ns\": \"search.users\", \"count\": 12}",
                        "{\"ns\": \"search.empty\"}",
                        "not json"
                    ]
                }
            }]
        }))
        .unwrap();

        let stats = parse_collection_stats(feed);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get("search.users"), Some(&12));
    }

    #[test]
    fn test_namespaced_paths() {
        assert_eq!(
            namespaced_path(EntityKind::KvStoreCollection, "search"),
            vec!["servicesNS", "nobody", "search", "storage", "collections", "config"]
        );
        assert_eq!(
            namespaced_path(EntityKind::SavedSearch, "search"),
            vec!["servicesNS", "nobody", "search", "saved", "searches"]
        );
    }

    #[test]
    fn test_url_escapes_segments() {
        let connector = SplunkConnector::new(&config()).unwrap();
        let url = connector.session.url(&["services", "data", "indexes", "a b/c"]).unwrap();
        assert_eq!(url.path(), "/services/data/indexes/a%20b%2Fc");
    }

    #[test]
    fn test_token_auth_preferred_over_password() {
        let mut config = config();
        config.token = Some("abc".to_string());
        let connector = SplunkConnector::new(&config).unwrap();
        assert!(matches!(connector.session.auth, Auth::Token(ref t) if t == "abc"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = config();
        config.host = "bad host".to_string();
        let err = SplunkConnector::new(&config).err().unwrap();
        assert_eq!(err.kind, crate::domains::backend::BackendErrorKind::InvalidArgument);
    }
}
