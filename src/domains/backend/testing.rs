//! Scripted in-memory backend used by tests.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::{BackendError, BackendResult};
use super::model::{ConnectionInfo, Entity, EntityKind, SearchRequest, SearchRow};
use super::session::{BackendConnector, BackendSession};

#[derive(Default)]
struct FakeState {
    calls: AtomicUsize,
    entities: Mutex<HashMap<EntityKind, Vec<Entity>>>,
    search_rows: Mutex<Vec<SearchRow>>,
    search_delays: Mutex<HashMap<String, Duration>>,
    searches: Mutex<Vec<SearchRequest>>,
    scripted_failures: Mutex<VecDeque<BackendError>>,
    persistent_failure: Mutex<Option<BackendError>>,
    principal: Mutex<Option<String>>,
    stats: Mutex<Option<HashMap<String, u64>>>,
}

/// A backend whose responses, failures and latency are scripted up front.
///
/// Clones share state, so a test can keep a handle for assertions after
/// handing a clone to the code under test.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(self, kind: EntityKind, entities: Vec<Entity>) -> Self {
        self.state.entities.lock().unwrap().insert(kind, entities);
        self
    }

    pub fn with_indexes(self, names: &[&str]) -> Self {
        let entities = names.iter().map(|n| Entity::new(*n)).collect();
        self.with_entities(EntityKind::Index, entities)
    }

    pub fn with_search_rows(self, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|r| r.as_object().cloned())
            .collect();
        *self.state.search_rows.lock().unwrap() = rows;
        self
    }

    /// Delay searches whose query equals `query`.
    pub fn with_search_delay(self, query: &str, delay: Duration) -> Self {
        self.state
            .search_delays
            .lock()
            .unwrap()
            .insert(query.to_string(), delay);
        self
    }

    pub fn with_principal(self, name: &str) -> Self {
        *self.state.principal.lock().unwrap() = Some(name.to_string());
        self
    }

    pub fn with_stats(self, stats: &[(&str, u64)]) -> Self {
        let stats = stats.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        *self.state.stats.lock().unwrap() = Some(stats);
        self
    }

    /// Fail the next operation with `err`. Queued failures are consumed in order.
    pub fn fail_next(self, err: BackendError) -> Self {
        self.state.scripted_failures.lock().unwrap().push_back(err);
        self
    }

    /// Fail every operation with `err`.
    pub fn fail_always(self, err: BackendError) -> Self {
        *self.state.persistent_failure.lock().unwrap() = Some(err);
        self
    }

    /// Number of session operations attempted so far.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Searches received so far.
    pub fn searches(&self) -> Vec<SearchRequest> {
        self.state.searches.lock().unwrap().clone()
    }

    fn record(&self) -> BackendResult<()> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.state.scripted_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        match self.state.persistent_failure.lock().unwrap().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn entities(&self, kind: EntityKind) -> Vec<Entity> {
        self.state
            .entities
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl BackendSession for FakeBackend {
    async fn search(&self, request: &SearchRequest) -> BackendResult<Vec<SearchRow>> {
        self.record()?;
        self.state.searches.lock().unwrap().push(request.clone());
        let delay = self
            .state
            .search_delays
            .lock()
            .unwrap()
            .get(&request.query)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let rows = self.state.search_rows.lock().unwrap().clone();
        let limit = request.max_results.map_or(rows.len(), |m| m as usize);
        Ok(rows.into_iter().take(limit).collect())
    }

    async fn list_entities(&self, kind: EntityKind) -> BackendResult<Vec<Entity>> {
        self.record()?;
        Ok(self.entities(kind))
    }

    async fn get_entity(&self, kind: EntityKind, name: &str) -> BackendResult<Entity> {
        self.record()?;
        self.entities(kind)
            .into_iter()
            .find(|e| e.name == name)
            .ok_or_else(|| BackendError::not_found(format!("{} not found: {}", kind.as_str(), name)))
    }

    async fn create_entity(
        &self,
        kind: EntityKind,
        app: &str,
        name: &str,
        attributes: &Map<String, Value>,
    ) -> BackendResult<Entity> {
        self.record()?;
        let entity = Entity {
            name: name.to_string(),
            app: Some(app.to_string()),
            owner: Some("nobody".to_string()),
            content: attributes.clone(),
        };
        self.state
            .entities
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push(entity.clone());
        Ok(entity)
    }

    async fn delete_entity(&self, kind: EntityKind, app: &str, name: &str) -> BackendResult<()> {
        self.record()?;
        let mut entities = self.state.entities.lock().unwrap();
        let list = entities.entry(kind).or_default();
        let before = list.len();
        list.retain(|e| !(e.name == name && e.app.as_deref().unwrap_or(app) == app));
        if list.len() == before {
            return Err(BackendError::not_found(format!("{} not found: {}", kind.as_str(), name)));
        }
        Ok(())
    }

    async fn current_principal(&self) -> BackendResult<String> {
        self.record()?;
        self.state
            .principal
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BackendError::unavailable("current context unavailable"))
    }

    async fn collection_stats(&self) -> BackendResult<HashMap<String, u64>> {
        self.record()?;
        self.state
            .stats
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BackendError::unavailable("introspection disabled"))
    }
}

#[async_trait]
impl BackendConnector for FakeBackend {
    async fn connect(&self) -> BackendResult<Arc<dyn BackendSession>> {
        Ok(Arc::new(self.clone()))
    }

    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            host: "splunk.test".to_string(),
            port: 8089,
            scheme: "https".to_string(),
            username: "admin".to_string(),
            ssl_verify: true,
        }
    }
}
