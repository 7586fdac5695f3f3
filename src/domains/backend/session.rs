//! Traits describing the backend collaborator.
//!
//! A [`BackendConnector`] produces [`BackendSession`]s. Sessions expose the
//! operations tool handlers need; each call is isolated, so a session may be
//! shared by concurrent requests.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::error::BackendResult;
use super::model::{ConnectionInfo, Entity, EntityKind, SearchRequest, SearchRow};

/// An authenticated session against the backend.
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// Run a search to completion and return its result rows.
    async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<SearchRow>>;

    /// List every entity of the given kind.
    async fn list_entities(&self, kind: EntityKind) -> BackendResult<Vec<Entity>>;

    /// Fetch one entity by name.
    async fn get_entity(&self, kind: EntityKind, name: &str) -> BackendResult<Entity>;

    /// Create a named entity inside an app namespace.
    async fn create_entity(
        &self,
        kind: EntityKind,
        app: &str,
        name: &str,
        attributes: &Map<String, Value>,
    ) -> BackendResult<Entity>;

    /// Delete a named entity from an app namespace.
    async fn delete_entity(&self, kind: EntityKind, app: &str, name: &str) -> BackendResult<()>;

    /// Name of the principal the session is authenticated as.
    async fn current_principal(&self) -> BackendResult<String>;

    /// Record counts of KV store collections, keyed by `app.collection`.
    async fn collection_stats(&self) -> BackendResult<HashMap<String, u64>>;
}

/// Factory for backend sessions.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Acquire a session. Implementations may hand out a pooled session.
    async fn connect(&self) -> BackendResult<Arc<dyn BackendSession>>;

    /// Describe the endpoint this connector talks to.
    fn info(&self) -> ConnectionInfo;
}
