//! HTTP transport implementation.
//!
//! One axum server hosts three surfaces over the same [`ToolServer`]:
//! - the synchronous REST API under the configured prefix ([`api`]),
//! - the SSE streaming adapter and its companion channel ([`sse`]),
//! - a stateless MCP JSON-RPC endpoint at `POST /mcp`.
//!
//! Ctrl-C stops accepting connections and cancels every open stream.

mod api;
mod connection;
mod sse;

use axum::{
    Json, Router,
    extract::{State, rejection::BytesRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use super::{TransportError, TransportResult, config::HttpConfig, protocol};
use crate::core::ToolServer;
use crate::core::server::PROTOCOL_VERSION;

pub use api::{openapi_document, status_for, status_for_kind};
pub use connection::{
    ConnectionRegistry, ConnectionSnapshot, ConnectionState, StreamEvent, SubmitError,
};

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    server: ToolServer,
    connections: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
    api_prefix: String,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given config.
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Run the HTTP transport until Ctrl-C.
    pub async fn run(self, server: ToolServer) -> TransportResult<()> {
        let addr = self.address();
        let streaming = server.config().streaming.clone();
        let shutdown = CancellationToken::new();
        let app = router(server, &self.config, shutdown.clone());

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        let cors_status = if self.config.enable_cors {
            "enabled"
        } else {
            "disabled"
        };
        let prefix = &self.config.api_prefix;
        info!("Ready - listening on {} (CORS {})", addr, cors_status);
        info!("  → API:      {}/tools/{{name}}, {}/execute", prefix, prefix);
        info!("  → Health:   GET {}/health", prefix);
        info!("  → SSE:      GET {} (POST {})", streaming.sse_path, streaming.messages_path);
        info!("  → JSON-RPC: POST /mcp");
        info!("  → Docs:     GET /docs, GET /redoc");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await
            .map_err(|e| TransportError::http(e.to_string()))?;

        info!("HTTP transport stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C, after cancelling every streaming connection.
async fn shutdown_signal(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
    shutdown.cancel();
}

/// Build the full router. Streams opened through it close when `shutdown` is cancelled.
pub fn router(server: ToolServer, config: &HttpConfig, shutdown: CancellationToken) -> Router {
    let streaming = server.config().streaming.clone();
    let state = AppState {
        server,
        connections: Arc::new(ConnectionRegistry::new()),
        shutdown,
        api_prefix: config.api_prefix.clone(),
    };

    let mut app = Router::new()
        .route("/", get(root_handler))
        .route("/mcp", post(handle_rpc))
        .merge(api::routes(&config.api_prefix))
        .merge(sse::routes(&streaming))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }
    app
}

/// Root handler - provides server info and the endpoint map.
async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    let server = &state.server;
    let prefix = &state.api_prefix;
    let streaming = &server.config().streaming;
    Json(json!({
        "name": server.name(),
        "version": server.version(),
        "protocol_version": PROTOCOL_VERSION,
        "tools": server.registry().len(),
        "endpoints": {
            "health": format!("{prefix}/health"),
            "tools": format!("{prefix}/tools"),
            "invoke": format!("{prefix}/tools/{{name}}"),
            "execute": format!("{prefix}/execute"),
            "openapi": "/openapi.json",
            "docs": "/docs",
            "redoc": "/redoc",
            "sse": streaming.sse_path,
            "messages": streaming.messages_path,
            "rpc": "/mcp"
        }
    }))
}

/// Stateless JSON-RPC. Notifications are acknowledged with 202 and no body.
#[instrument(skip_all)]
async fn handle_rpc(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return api::body_rejection(rejection),
    };
    match protocol::respond(&state.server, &body).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{app, body_json};
    use crate::domains::backend::testing::FakeBackend;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn rpc(body: &str) -> Request<Body> {
        Request::post("/mcp")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let response = app(&FakeBackend::new())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["name"], "splunk-mcp");
        assert_eq!(body["endpoints"]["sse"], "/sse");
        assert_eq!(body["endpoints"]["health"], "/api/v1/health");
        assert_eq!(body["endpoints"]["docs"], "/docs");
        assert_eq!(body["endpoints"]["redoc"], "/redoc");
    }

    #[tokio::test]
    async fn test_rpc_endpoint() {
        let app = app(&FakeBackend::new().with_indexes(&["main"]));

        let response = app
            .clone()
            .oneshot(rpc(
                r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                    "params": {"name": "list_indexes"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["structuredContent"]["indexes"], json!(["main"]));

        let notification = app
            .oneshot(rpc(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#))
            .await
            .unwrap();
        assert_eq!(notification.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_rpc_oversized_body() {
        let body = format!(r#"{{"jsonrpc": "2.0", "id": 1, "method": "{}"}}"#, "x".repeat(3 * 1024 * 1024));
        let response = app(&FakeBackend::new()).oneshot(rpc(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let response = app(&FakeBackend::new())
            .oneshot(
                Request::options("/api/v1/tools")
                    .header("origin", "http://example.com")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
