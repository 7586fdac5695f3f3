//! SSE streaming adapter.
//!
//! `GET /sse` opens a connection and streams its events; requests for it are
//! posted to `POST /messages?session_id=<id>` and answered on the stream.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::BytesRejection},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::AppState;
use super::api::body_rejection;
use super::connection::{StreamEvent, SubmitError};
use crate::core::config::StreamingConfig;
use crate::core::transport::protocol::{self, Frame};
use crate::domains::tools::{Envelope, ErrorKind, Failure};

/// Streaming routes, mounted at the configured paths.
pub fn routes(streaming: &StreamingConfig) -> Router<AppState> {
    Router::new()
        .route(&streaming.sse_path, get(open_stream))
        .route(&format!("{}/health", streaming.sse_path), get(stream_health))
        .route(&streaming.messages_path, post(post_message))
}

async fn open_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let settings = state.server.config().streaming.clone();
    let conn = state
        .connections
        .open(state.server.clone(), settings, &state.shutdown)
        .await;
    debug!(connection_id = %conn.id, "Event stream attached");

    Sse::new(ReceiverStream::new(conn.events).map(to_sse_event))
}

fn to_sse_event(event: StreamEvent) -> Result<Event, Infallible> {
    let data = event.data().unwrap_or_else(|e| {
        warn!("Failed to encode {} event: {}", event.name(), e);
        json!({ "error": e.to_string() }).to_string()
    });
    Ok(Event::default().event(event.name()).data(data))
}

/// One-shot stream carrying the liveness report as a `health` event.
async fn stream_health(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let event = Event::default()
        .event("health")
        .data(state.server.liveness().to_string());
    Sse::new(stream::once(async move { Ok(event) }))
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

#[instrument(skip_all, fields(session_id))]
async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Some(session_id) = query.session_id else {
        return rejection(
            StatusCode::BAD_REQUEST,
            Failure::new(ErrorKind::InvalidArguments, "Missing session_id query parameter"),
        );
    };
    tracing::Span::current().record("session_id", session_id.as_str());

    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection(rejection),
    };
    let frame = match protocol::decode(&body) {
        Ok(frame) => with_request_id(frame),
        Err(reply) => return (StatusCode::BAD_REQUEST, Json(reply)).into_response(),
    };
    let request_id = frame.correlation_id().cloned();

    match state.connections.submit(&session_id, frame).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "accepted": true, "request_id": request_id })),
        )
            .into_response(),
        Err(e @ SubmitError::UnknownConnection(_)) => rejection(
            StatusCode::NOT_FOUND,
            Failure::new(ErrorKind::NotFound, e.to_string()),
        ),
        Err(e @ SubmitError::QueueFull) => {
            warn!("Refusing request: {}", e);
            rejection(
                StatusCode::SERVICE_UNAVAILABLE,
                Failure::new(ErrorKind::Unavailable, e.to_string()),
            )
        }
    }
}

/// Invocations without a request id get one so their result can be correlated.
fn with_request_id(frame: Frame) -> Frame {
    match frame {
        Frame::Invocation(request) if request.request_id.is_none() => {
            Frame::Invocation(request.with_request_id(Uuid::new_v4().to_string()))
        }
        other => other,
    }
}

fn rejection(status: StatusCode, failure: Failure) -> Response {
    (status, Json(Envelope::failure(None, failure))).into_response()
}
