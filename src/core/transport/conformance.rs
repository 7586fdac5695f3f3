//! The same requests through STDIO, the REST API and SSE must agree.

use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::http::testing::{SseReader, app, body_json};
use super::stdio::StdioTransport;
use crate::core::server::testing::server;
use crate::domains::backend::BackendError;
use crate::domains::backend::testing::FakeBackend;

const LIST_INDEXES: &str = r#"{"tool_name": "list_indexes", "arguments": {}, "request_id": "c1"}"#;
const TIMED_OUT_SEARCH: &str = r#"{"tool_name": "search", "arguments": {"search_query": "index=_internal | head 5"}, "request_id": "c1"}"#;

async fn via_stdio(fake: &FakeBackend, frame: &str) -> Value {
    let mut output = Vec::new();
    StdioTransport::serve(&server(fake), format!("{frame}\n").as_bytes(), &mut output)
        .await
        .unwrap();
    serde_json::from_slice(output.trim_ascii()).unwrap()
}

async fn via_api(fake: &FakeBackend, frame: &str) -> (StatusCode, Value) {
    let response = app(fake)
        .oneshot(
            Request::post("/api/v1/execute")
                .header("content-type", "application/json")
                .body(Body::from(frame.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn via_sse(fake: &FakeBackend, frame: &str) -> Value {
    let app = app(fake);
    let response = app
        .clone()
        .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let mut events = SseReader::new(response.into_body());
    let (_, meta) = events.next_event().await;
    let endpoint = meta["endpoint"].as_str().unwrap().to_string();

    let accepted = app
        .oneshot(
            Request::post(endpoint)
                .header("content-type", "application/json")
                .body(Body::from(frame.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::ACCEPTED);

    let (name, result) = events.next_non_heartbeat().await;
    assert_eq!(name, "result");
    result
}

#[tokio::test]
async fn test_list_indexes_agrees_across_transports() {
    let fake = FakeBackend::new().with_indexes(&["main", "_internal", "security"]);
    let expected = json!({"indexes": ["main", "_internal", "security"]});

    let stdio = via_stdio(&fake, LIST_INDEXES).await;
    let (status, api) = via_api(&fake, LIST_INDEXES).await;
    let sse = via_sse(&fake, LIST_INDEXES).await;

    assert_eq!(status, StatusCode::OK);
    for envelope in [&stdio, &api, &sse] {
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["request_id"], "c1");
        assert_eq!(envelope["result"], expected);
    }
}

#[tokio::test]
async fn test_backend_timeout_agrees_across_transports() {
    let timeout = || FakeBackend::new().fail_always(BackendError::timeout("read timed out"));

    let fake = timeout();
    let stdio = via_stdio(&fake, TIMED_OUT_SEARCH).await;
    assert_eq!(fake.calls(), 2);

    let fake = timeout();
    let (status, api) = via_api(&fake, TIMED_OUT_SEARCH).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(fake.calls(), 2);

    let fake = timeout();
    let sse = via_sse(&fake, TIMED_OUT_SEARCH).await;
    assert_eq!(fake.calls(), 2);

    for envelope in [&stdio, &api, &sse] {
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"]["kind"], "timeout");
    }
}
