//! Synchronous REST API.
//!
//! Every tool is reachable at `POST {prefix}/tools/{name}` with its arguments
//! as the JSON body. The response body is always an [`Envelope`]; the status
//! code is derived from the outcome.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::BytesRejection},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use http::StatusCode;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use super::AppState;
use crate::core::ToolServer;
use crate::domains::tools::{Envelope, ErrorKind, Failure, InvocationRequest, InvocationResult};

/// API routes under `prefix`, plus the OpenAPI document.
pub fn routes(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{prefix}/health"), get(health))
        .route(&format!("{prefix}/tools"), get(list_tools))
        .route(&format!("{prefix}/tools/{{name}}"), post(invoke_tool))
        .route(&format!("{prefix}/execute"), post(execute))
        .route("/openapi.json", get(openapi))
        .route("/docs", get(swagger_ui))
        .route("/redoc", get(redoc))
}

/// HTTP status for an error kind.
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArguments | ErrorKind::ParseError => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound | ErrorKind::UnknownTool => StatusCode::NOT_FOUND,
        ErrorKind::Timeout | ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// HTTP status for an invocation outcome.
pub fn status_for(result: &InvocationResult) -> StatusCode {
    result.error_kind().map_or(StatusCode::OK, status_for_kind)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.server.liveness())
}

async fn list_tools(State(state): State<AppState>) -> impl IntoResponse {
    let tools = state.server.list_tools();
    Json(json!({ "count": tools.len(), "tools": tools }))
}

#[instrument(skip(state, body))]
async fn invoke_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection(rejection),
    };
    match arguments_from_body(&body) {
        Ok(arguments) => respond(&state.server, InvocationRequest::new(name, arguments)).await,
        Err(failure) => reject(failure),
    }
}

#[instrument(skip_all)]
async fn execute(State(state): State<AppState>, body: Result<Bytes, BytesRejection>) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection(rejection),
    };
    match serde_json::from_slice::<InvocationRequest>(&body) {
        Ok(request) => respond(&state.server, request).await,
        Err(e) => reject(
            Failure::new(ErrorKind::ParseError, "Malformed invocation request").with_detail(e.to_string()),
        ),
    }
}

async fn openapi(State(state): State<AppState>) -> impl IntoResponse {
    Json(openapi_document(&state.server, &state.api_prefix))
}

const SWAGGER_UI: &str = r##"<!DOCTYPE html>
<html>
<head>
  <title>{title} - API docs</title>
  <meta charset="utf-8"/>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({ url: "/openapi.json", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;

const REDOC: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>{title} - ReDoc</title>
  <meta charset="utf-8"/>
</head>
<body>
  <redoc spec-url="/openapi.json"></redoc>
  <script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>
"#;

/// Interactive documentation rendered from `/openapi.json`.
async fn swagger_ui(State(state): State<AppState>) -> Html<String> {
    Html(SWAGGER_UI.replace("{title}", state.server.name()))
}

async fn redoc(State(state): State<AppState>) -> Html<String> {
    Html(REDOC.replace("{title}", state.server.name()))
}

/// An empty body means no arguments.
fn arguments_from_body(body: &[u8]) -> Result<Map<String, Value>, Failure> {
    if body.trim_ascii().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(_) => Err(Failure::new(
            ErrorKind::ParseError,
            "Request body must be a JSON object",
        )),
        Err(e) => Err(Failure::new(ErrorKind::ParseError, "Malformed request body").with_detail(e.to_string())),
    }
}

async fn respond(server: &ToolServer, request: InvocationRequest) -> Response {
    let request_id = request.request_id.clone();
    let result = server.dispatch(request).await;
    let status = status_for(&result);
    debug!("Responding with {}", status);
    (status, Json(result.into_envelope(request_id))).into_response()
}

fn reject(failure: Failure) -> Response {
    (
        status_for_kind(failure.kind),
        Json(Envelope::failure(None, failure)),
    )
        .into_response()
}

/// Oversized or unreadable bodies keep the rejection's status but still get an envelope.
pub(super) fn body_rejection(rejection: BytesRejection) -> Response {
    let status = rejection.status();
    let kind = if status == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorKind::InvalidArguments
    } else {
        ErrorKind::ParseError
    };
    debug!("Request body rejected with {}", status);
    let failure = Failure::new(kind, "Request body rejected").with_detail(rejection.body_text());
    (status, Json(Envelope::failure(None, failure))).into_response()
}

// ============================================================================
// OpenAPI
// ============================================================================

fn envelope_responses() -> Value {
    json!({
        "200": { "description": "Tool succeeded" },
        "400": { "description": "Invalid arguments or malformed body" },
        "401": { "description": "Backend rejected the credentials" },
        "403": { "description": "Backend denied the operation" },
        "404": { "description": "Unknown tool or backend object not found" },
        "413": { "description": "Request body too large" },
        "500": { "description": "Internal error" },
        "503": { "description": "Backend unavailable or deadline exceeded" }
    })
}

/// OpenAPI 3 description of the HTTP surface, generated from the registry.
pub fn openapi_document(server: &ToolServer, prefix: &str) -> Value {
    let streaming = &server.config().streaming;
    let mut paths = Map::new();

    paths.insert(
        format!("{prefix}/health"),
        json!({ "get": {
            "summary": "Liveness check",
            "responses": { "200": { "description": "Server is running" } }
        }}),
    );
    paths.insert(
        format!("{prefix}/tools"),
        json!({ "get": {
            "summary": "List registered tools",
            "responses": { "200": { "description": "Tool names, descriptions and parameters" } }
        }}),
    );
    paths.insert(
        format!("{prefix}/execute"),
        json!({ "post": {
            "summary": "Run any tool by name",
            "requestBody": { "required": true, "content": { "application/json": { "schema": {
                "type": "object",
                "required": ["tool_name"],
                "properties": {
                    "tool_name": { "type": "string" },
                    "arguments": { "type": "object" },
                    "request_id": {}
                }
            }}}},
            "responses": envelope_responses()
        }}),
    );

    for tool in server.registry().list() {
        paths.insert(
            format!("{prefix}/tools/{}", tool.name()),
            json!({ "post": {
                "operationId": tool.name(),
                "summary": tool.description(),
                "requestBody": { "content": { "application/json": { "schema": tool.input_schema() } } },
                "responses": envelope_responses()
            }}),
        );
    }

    paths.insert(
        streaming.sse_path.clone(),
        json!({ "get": {
            "summary": "SSE connection",
            "description": "Event stream: endpoint metadata, heartbeats and one result per posted request",
            "responses": { "200": { "description": "SSE connection established" } }
        }}),
    );
    paths.insert(
        streaming.messages_path.clone(),
        json!({ "post": {
            "summary": "Submit a request to an SSE connection",
            "parameters": [{
                "name": "session_id", "in": "query", "required": true,
                "schema": { "type": "string" }
            }],
            "responses": {
                "202": { "description": "Request accepted; the result arrives on the stream" },
                "400": { "description": "Malformed frame" },
                "404": { "description": "Unknown connection" },
                "503": { "description": "Connection request queue is full" }
            }
        }}),
    );
    paths.insert(
        "/mcp".to_string(),
        json!({ "post": {
            "summary": "MCP JSON-RPC endpoint",
            "responses": { "200": { "description": "JSON-RPC response" } }
        }}),
    );

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": server.name(),
            "version": server.version(),
            "description": "Splunk tools over a synchronous API, SSE streaming and MCP JSON-RPC"
        },
        "paths": paths
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{app, app_with, body_json};
    use super::*;
    use crate::domains::backend::BackendError;
    use crate::domains::backend::testing::FakeBackend;
    use axum::body::Body;
    use http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn call(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ErrorKind::InvalidArguments, 400),
            (ErrorKind::ParseError, 400),
            (ErrorKind::Unauthorized, 401),
            (ErrorKind::Forbidden, 403),
            (ErrorKind::NotFound, 404),
            (ErrorKind::UnknownTool, 404),
            (ErrorKind::Timeout, 503),
            (ErrorKind::Unavailable, 503),
            (ErrorKind::Internal, 500),
        ];
        for (kind, status) in cases {
            assert_eq!(status_for_kind(kind).as_u16(), status, "{kind}");
        }
        assert_eq!(status_for(&InvocationResult::success(json!({}))), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_tool_route_success() {
        let app = app(&FakeBackend::new().with_indexes(&["main", "_internal", "security"]));
        let (status, body) = call(app, "/api/v1/tools/list_indexes", "").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["indexes"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failures_keep_envelope_shape() {
        let fake = FakeBackend::new();
        let (status, body) = call(app(&fake), "/api/v1/tools/get_index_info", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "invalid_arguments");

        let (status, body) = call(app(&fake), "/api/v1/tools/nope", "{}").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "unknown_tool");

        let (status, body) = call(app(&fake), "/api/v1/tools/list_indexes", "[1]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "parse_error");
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_body_gets_envelope() {
        let fake = FakeBackend::new();
        let query = "a".repeat(3 * 1024 * 1024);
        let body = json!({ "search_query": query }).to_string();

        let (status, envelope) = call(app(&fake), "/api/v1/tools/search", &body).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"]["kind"], "invalid_arguments");

        let frame = json!({ "tool_name": "search", "arguments": { "search_query": query } });
        let (status, envelope) = call(app(&fake), "/api/v1/execute", &frame.to_string()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(envelope["success"], false);
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_docs_pages_point_at_openapi() {
        for uri in ["/docs", "/redoc"] {
            let response = app(&FakeBackend::new())
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert!(
                response.headers()["content-type"]
                    .to_str()
                    .unwrap()
                    .starts_with("text/html")
            );
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let page = String::from_utf8(bytes.to_vec()).unwrap();
            assert!(page.contains("/openapi.json"), "{uri}");
            assert!(page.contains("splunk-mcp"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_backend_errors_map_to_status() {
        let forbidden = FakeBackend::new().fail_always(BackendError::permission_denied("no"));
        let (status, _) = call(app(&forbidden), "/api/v1/tools/list_users", "").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let unauthorized = FakeBackend::new().fail_always(BackendError::auth("bad password"));
        let (status, body) = call(app(&unauthorized), "/api/v1/tools/list_indexes", "").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["kind"], "unauthorized");

        let down = FakeBackend::new().fail_always(BackendError::unavailable("503"));
        let (status, _) = call(app(&down), "/api/v1/tools/list_indexes", "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_execute_route() {
        let app = app(&FakeBackend::new());
        let (status, body) = call(
            app.clone(),
            "/api/v1/execute",
            r#"{"tool_name": "ping", "request_id": "x"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["request_id"], "x");

        let (status, body) = call(app, "/api/v1/execute", r#"{"arguments": {}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "parse_error");
    }

    #[tokio::test]
    async fn test_health_and_listing_skip_backend() {
        let fake = FakeBackend::new();
        let (status, body) = get_json(app(&fake), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = get_json(app(&fake), "/api/v1/tools").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 14);
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let app = app_with(&FakeBackend::new(), |http| http.api_prefix = String::new());
        let (status, _) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_openapi_lists_every_tool() {
        let fake = FakeBackend::new();
        let (status, doc) = get_json(app(&fake), "/openapi.json").await;
        assert_eq!(status, StatusCode::OK);

        let search = &doc["paths"]["/api/v1/tools/search"]["post"];
        assert_eq!(search["operationId"], "search");
        assert_eq!(
            search["requestBody"]["content"]["application/json"]["schema"]["required"],
            json!(["search_query"])
        );
        assert!(doc["paths"]["/messages"].is_object());
    }
}
