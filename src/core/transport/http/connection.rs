//! Streaming connections.
//!
//! Every SSE client gets its own task. The task owns the heartbeat timer, the
//! bounded queue of requests posted on the companion channel and the ordered
//! set of dispatches still running for that client. Results are emitted in the
//! order requests were accepted, whatever order they finish in. A slow or
//! vanished client only ever stalls its own task.
//!
//! Lifecycle: `Opening` until the metadata event is queued, `Open` while
//! serving, then `Closing` and `Closed` once the client disconnects, stops
//! reading, or the server shuts down. Results of dispatches still running at
//! that point are discarded.
//!
//! Each connection records when it was opened and when its last heartbeat was
//! delivered; [`ConnectionRegistry::info`] reports both next to the state.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::FuturesOrdered;
use futures::{FutureExt, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc, watch};
use tokio::task::JoinError;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::ToolServer;
use crate::core::config::StreamingConfig;
use crate::core::server::PROTOCOL_VERSION;
use crate::core::transport::protocol::{self, Frame, JsonRpcResponse, Reply};
use crate::domains::tools::{Envelope, ErrorKind, Failure};

/// Events buffered per connection before sends start to wait on the client.
const EVENT_BUFFER: usize = 64;

/// Lifecycle of a streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Opening,
    Open,
    Closing,
    Closed,
}

/// One outbound event on a connection's stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Connection metadata, always the first event.
    Endpoint(Value),
    Heartbeat(Value),
    /// Reply to one accepted request.
    Result(Reply),
}

impl StreamEvent {
    /// SSE event name. JSON-RPC replies travel as `message`, MCP's convention.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Endpoint(_) => "endpoint",
            Self::Heartbeat(_) => "heartbeat",
            Self::Result(Reply::Envelope(_)) => "result",
            Self::Result(Reply::Rpc(_)) => "message",
        }
    }

    /// JSON payload of the event.
    pub fn data(&self) -> serde_json::Result<String> {
        match self {
            Self::Endpoint(v) | Self::Heartbeat(v) => serde_json::to_string(v),
            Self::Result(reply) => serde_json::to_string(reply),
        }
    }
}

/// Why a request could not be queued on a connection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Unknown or closed connection: {0}")]
    UnknownConnection(String),

    #[error("Request queue is full")]
    QueueFull,
}

/// A freshly opened connection, as seen by the SSE handler.
pub struct OpenedConnection {
    pub id: String,
    pub events: mpsc::Receiver<StreamEvent>,
    pub state: watch::Receiver<ConnectionState>,
}

/// Snapshot of a live connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSnapshot {
    pub state: ConnectionState,
    pub created_at: DateTime<Utc>,
    /// Time of the last heartbeat the client accepted.
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

struct ConnectionHandle {
    requests: mpsc::Sender<Frame>,
    state: watch::Receiver<ConnectionState>,
    created_at: DateTime<Utc>,
    last_heartbeat_at: watch::Receiver<Option<DateTime<Utc>>>,
}

// ============================================================================
// Registry
// ============================================================================

/// Live connections by id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection and spawn its task.
    ///
    /// The connection is cancelled together with `shutdown`.
    pub async fn open(
        self: &Arc<Self>,
        server: ToolServer,
        settings: StreamingConfig,
        shutdown: &CancellationToken,
    ) -> OpenedConnection {
        let id = Uuid::new_v4().to_string();
        let (request_tx, request_rx) = mpsc::channel(settings.request_queue_depth.max(1));
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Opening);
        let (heartbeat_tx, heartbeat_rx) = watch::channel(None);
        let created_at = Utc::now();

        self.connections.write().await.insert(
            id.clone(),
            ConnectionHandle {
                requests: request_tx,
                state: state_rx.clone(),
                created_at,
                last_heartbeat_at: heartbeat_rx,
            },
        );

        let task = ConnectionTask {
            id: id.clone(),
            server,
            settings,
            registry: Arc::clone(self),
            requests: request_rx,
            events: event_tx,
            state: state_tx,
            last_heartbeat_at: heartbeat_tx,
            created_at,
            cancel: shutdown.child_token(),
        };
        tokio::spawn(task.run());
        info!(connection_id = %id, "Streaming connection opened");

        OpenedConnection {
            id,
            events: event_rx,
            state: state_rx,
        }
    }

    /// Queue a request on connection `id` without waiting.
    pub async fn submit(&self, id: &str, frame: Frame) -> Result<(), SubmitError> {
        let connections = self.connections.read().await;
        let handle = connections
            .get(id)
            .ok_or_else(|| SubmitError::UnknownConnection(id.to_string()))?;
        handle.requests.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => SubmitError::QueueFull,
            TrySendError::Closed(_) => SubmitError::UnknownConnection(id.to_string()),
        })
    }

    /// State and timestamps of connection `id`, if it is still registered.
    pub async fn info(&self, id: &str) -> Option<ConnectionSnapshot> {
        self.connections
            .read()
            .await
            .get(id)
            .map(|h| ConnectionSnapshot {
                state: *h.state.borrow(),
                created_at: h.created_at,
                last_heartbeat_at: *h.last_heartbeat_at.borrow(),
            })
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    async fn remove(&self, id: &str) {
        self.connections.write().await.remove(id);
    }
}

// ============================================================================
// Connection task
// ============================================================================

struct ConnectionTask {
    id: String,
    server: ToolServer,
    settings: StreamingConfig,
    registry: Arc<ConnectionRegistry>,
    requests: mpsc::Receiver<Frame>,
    events: mpsc::Sender<StreamEvent>,
    state: watch::Sender<ConnectionState>,
    last_heartbeat_at: watch::Sender<Option<DateTime<Utc>>>,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
}

/// A dispatch still running, tagged with the request it answers.
type Pending = BoxFuture<'static, (Origin, Result<Option<Reply>, JoinError>)>;

enum Step {
    Stop(&'static str),
    Completed(Origin, Result<Option<Reply>, JoinError>),
    Heartbeat,
    Request(Option<Frame>),
}

/// Which kind of frame a dispatch came from, and its correlation id.
#[derive(Debug, Clone, PartialEq)]
enum Origin {
    Invocation(Option<Value>),
    Rpc(Option<Value>),
}

impl Origin {
    fn of(frame: &Frame) -> Self {
        let id = frame.correlation_id().cloned();
        match frame {
            Frame::Invocation(_) => Self::Invocation(id),
            Frame::Rpc(_) => Self::Rpc(id),
        }
    }

    /// Reply for a dispatch task that panicked or was aborted.
    /// JSON-RPC notifications get none.
    fn failed(self, err: &JoinError) -> Option<Reply> {
        match self {
            Self::Invocation(id) => {
                let failure = Failure::new(ErrorKind::Internal, "Request task failed")
                    .with_detail(err.to_string());
                Some(Reply::Envelope(Envelope::failure(id, failure)))
            }
            Self::Rpc(None) => None,
            Self::Rpc(id) => Some(Reply::Rpc(JsonRpcResponse::internal_error(
                id,
                format!("Request task failed: {err}"),
            ))),
        }
    }
}

impl ConnectionTask {
    async fn run(mut self) {
        if self.send(StreamEvent::Endpoint(self.metadata())).await {
            self.state.send_replace(ConnectionState::Open);
            self.serve().await;
        }

        self.state.send_replace(ConnectionState::Closing);
        self.requests.close();
        self.registry.remove(&self.id).await;
        self.state.send_replace(ConnectionState::Closed);
        let lifetime = Utc::now() - self.created_at;
        info!(
            connection_id = %self.id,
            "Streaming connection closed after {}s",
            lifetime.num_seconds()
        );
    }

    async fn serve(&mut self) {
        let period = self.settings.heartbeat_interval();
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight: FuturesOrdered<Pending> = FuturesOrdered::new();
        let mut sequence: u64 = 0;

        loop {
            let can_accept = in_flight.len() < self.settings.max_in_flight.max(1);
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Stop("server shutting down"),
                _ = self.events.closed() => Step::Stop("client disconnected"),
                Some((origin, joined)) = in_flight.next(), if !in_flight.is_empty() => {
                    Step::Completed(origin, joined)
                }
                _ = heartbeat.tick() => Step::Heartbeat,
                frame = self.requests.recv(), if can_accept => Step::Request(frame),
            };

            let delivered = match step {
                Step::Stop(reason) => {
                    debug!(connection_id = %self.id, "Closing: {}", reason);
                    break;
                }
                Step::Completed(_, Ok(None)) => true,
                Step::Completed(_, Ok(Some(reply))) => self.send(StreamEvent::Result(reply)).await,
                Step::Completed(origin, Err(e)) => {
                    warn!(connection_id = %self.id, "Request task failed: {}", e);
                    match origin.failed(&e) {
                        Some(reply) => self.send(StreamEvent::Result(reply)).await,
                        None => true,
                    }
                }
                Step::Heartbeat => {
                    sequence += 1;
                    let now = Utc::now();
                    let delivered = self
                        .send(StreamEvent::Heartbeat(json!({
                            "connection_id": self.id,
                            "timestamp": now.to_rfc3339(),
                            "sequence": sequence,
                        })))
                        .await;
                    if delivered {
                        self.last_heartbeat_at.send_replace(Some(now));
                    }
                    delivered
                }
                Step::Request(Some(frame)) => {
                    let origin = Origin::of(&frame);
                    let server = self.server.clone();
                    let task = tokio::spawn(async move { protocol::handle(&server, frame).await });
                    in_flight.push_back(task.map(move |joined| (origin, joined)).boxed());
                    true
                }
                Step::Request(None) => false,
            };

            if !delivered {
                break;
            }
        }

        if !in_flight.is_empty() {
            debug!(
                connection_id = %self.id,
                "Discarding {} in-flight results",
                in_flight.len()
            );
        }
    }

    /// Queue an event for the client. A client that does not drain its
    /// stream within one heartbeat interval is treated as gone. Shutdown
    /// abandons the send at once.
    async fn send(&self, event: StreamEvent) -> bool {
        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(connection_id = %self.id, "Shutdown while sending; event dropped");
                return false;
            }
            sent = timeout(self.settings.heartbeat_interval(), self.events.send(event)) => sent,
        };
        match sent {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                debug!(connection_id = %self.id, "Event stream dropped");
                false
            }
            Err(_) => {
                warn!(connection_id = %self.id, "Client stopped reading; closing connection");
                false
            }
        }
    }

    fn metadata(&self) -> Value {
        json!({
            "endpoint": format!("{}?session_id={}", self.settings.messages_path, self.id),
            "connection_id": self.id,
            "created_at": self.created_at.to_rfc3339(),
            "protocol_version": PROTOCOL_VERSION,
            "capabilities": self.server.server_info().capabilities,
            "tools": self.server.registry().tool_names(),
            "heartbeat_interval_ms": self.settings.heartbeat_interval_ms,
        })
    }
}
