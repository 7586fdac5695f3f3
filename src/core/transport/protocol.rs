//! Frame decoding and replies shared by the STDIO and streaming adapters.
//!
//! A frame is one JSON object. Objects carrying a `jsonrpc` member are MCP
//! JSON-RPC requests; anything else is a direct invocation
//! `{tool_name, arguments, request_id?}`. Both routes end in
//! [`ToolServer::dispatch`].

use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::core::ToolServer;
use crate::domains::tools::{Envelope, ErrorKind, Failure, InvocationRequest, InvocationResult};

// ============================================================================
// JSON-RPC messages
// ============================================================================

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Parse error.
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::error(None, -32700, msg)
    }

    /// Invalid request error.
    pub fn invalid_request(id: Option<Value>) -> Self {
        Self::error(id, -32600, "Invalid Request")
    }

    /// Method not found error.
    pub fn method_not_found(id: Option<Value>) -> Self {
        Self::error(id, -32601, "Method not found")
    }

    /// Invalid params error.
    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32603, msg)
    }
}

// ============================================================================
// Frames and replies
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone)]
pub enum Frame {
    Invocation(InvocationRequest),
    Rpc(JsonRpcRequest),
}

impl Frame {
    /// Correlation id: `request_id` of an invocation or `id` of a JSON-RPC request.
    pub fn correlation_id(&self) -> Option<&Value> {
        match self {
            Self::Invocation(r) => r.request_id.as_ref(),
            Self::Rpc(r) => r.id.as_ref(),
        }
    }
}

/// What goes back for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Envelope(Envelope),
    Rpc(JsonRpcResponse),
}

impl Reply {
    /// Correlation id: `request_id` of an envelope or `id` of a JSON-RPC reply.
    pub fn correlation_id(&self) -> Option<&Value> {
        match self {
            Self::Envelope(e) => e.request_id.as_ref(),
            Self::Rpc(r) => r.id.as_ref(),
        }
    }
}

fn parse_failure(request_id: Option<Value>, detail: impl Into<String>) -> Reply {
    Reply::Envelope(Envelope::failure(
        request_id,
        Failure::new(ErrorKind::ParseError, "Malformed request frame").with_detail(detail),
    ))
}

/// Correlation id of a frame that failed to decode, when one can be read.
fn recover_request_id(object: &Map<String, Value>) -> Option<Value> {
    object
        .get("request_id")
        .or_else(|| object.get("id"))
        .filter(|v| !v.is_null())
        .cloned()
}

/// Decode one frame. On failure, returns the reply to send instead.
pub fn decode(bytes: &[u8]) -> Result<Frame, Reply> {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return Err(parse_failure(None, "frame is not valid UTF-8"));
    };

    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) if text.contains("\"jsonrpc\"") => {
            return Err(Reply::Rpc(JsonRpcResponse::parse_error(e.to_string())));
        }
        Err(e) => return Err(parse_failure(None, e.to_string())),
    };

    let Value::Object(object) = value else {
        return Err(parse_failure(None, "frame must be a JSON object"));
    };

    if object.contains_key("jsonrpc") {
        let id = object.get("id").cloned();
        return serde_json::from_value(Value::Object(object))
            .map(Frame::Rpc)
            .map_err(|_| Reply::Rpc(JsonRpcResponse::invalid_request(id)));
    }

    let request_id = recover_request_id(&object);
    serde_json::from_value(Value::Object(object))
        .map(Frame::Invocation)
        .map_err(|e| parse_failure(request_id, e.to_string()))
}

/// Handle a decoded frame. Notifications produce no reply.
pub async fn handle(server: &ToolServer, frame: Frame) -> Option<Reply> {
    match frame {
        Frame::Invocation(request) => {
            let request_id = request.request_id.clone();
            let result = server.dispatch(request).await;
            Some(Reply::Envelope(result.into_envelope(request_id)))
        }
        Frame::Rpc(request) => process_rpc(server, request).await.map(Reply::Rpc),
    }
}

/// Decode and handle raw frame bytes.
pub async fn respond(server: &ToolServer, bytes: &[u8]) -> Option<Reply> {
    match decode(bytes) {
        Ok(frame) => handle(server, frame).await,
        Err(reply) => {
            warn!("Rejected malformed frame");
            Some(reply)
        }
    }
}

// ============================================================================
// MCP methods
// ============================================================================

/// Process a JSON-RPC request and return the response, if any.
pub async fn process_rpc(server: &ToolServer, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::invalid_request(request.id));
    }

    let response = match request.method.as_str() {
        "initialize" => handle_initialize(server, request),
        "ping" => JsonRpcResponse::success(request.id, json!({})),
        "tools/list" => handle_tools_list(server, request),
        "tools/call" => handle_tools_call(server, request).await,
        method if method.starts_with("notifications/") => {
            info!("Received notification: {}", method);
            return None;
        }
        _ => {
            warn!("Unknown method: {}", request.method);
            JsonRpcResponse::method_not_found(request.id)
        }
    };
    Some(response)
}

fn handle_initialize(server: &ToolServer, request: JsonRpcRequest) -> JsonRpcResponse {
    info!("Processing initialize request");
    match serde_json::to_value(server.server_info()) {
        Ok(result) => JsonRpcResponse::success(request.id, result),
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

fn handle_tools_list(server: &ToolServer, request: JsonRpcRequest) -> JsonRpcResponse {
    debug!("Processing tools/list request");
    match serde_json::to_value(server.mcp_tools()) {
        Ok(tools) => JsonRpcResponse::success(request.id, json!({ "tools": tools })),
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

async fn handle_tools_call(server: &ToolServer, request: JsonRpcRequest) -> JsonRpcResponse {
    let Some(params) = request.params else {
        return JsonRpcResponse::invalid_params(request.id, "Missing params");
    };
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::invalid_params(request.id, "Missing tool name");
    };
    if server.registry().resolve(name).is_none() {
        return JsonRpcResponse::invalid_params(request.id, format!("Unknown tool: {}", name));
    }
    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args.clone(),
        Some(_) => {
            return JsonRpcResponse::invalid_params(request.id, "Arguments must be an object");
        }
    };

    info!("Processing tools/call request: {}", name);
    let result = server.dispatch(InvocationRequest::new(name, arguments)).await;
    match serde_json::to_value(call_tool_result(result)) {
        Ok(value) => JsonRpcResponse::success(request.id, value),
        Err(e) => JsonRpcResponse::internal_error(request.id, e.to_string()),
    }
}

/// Render an invocation result as an MCP tool result.
pub fn call_tool_result(result: InvocationResult) -> CallToolResult {
    match result {
        InvocationResult::Success { payload } => CallToolResult {
            content: vec![Content::text(payload.to_string())],
            structured_content: Some(structured(payload)),
            is_error: Some(false),
            meta: None,
        },
        InvocationResult::Failure(failure) => {
            let text = match &failure.detail {
                Some(detail) => format!("{} ({}): {}", failure.message, failure.kind, detail),
                None => format!("{} ({})", failure.message, failure.kind),
            };
            CallToolResult {
                content: vec![Content::text(text)],
                structured_content: serde_json::to_value(&failure).ok(),
                is_error: Some(true),
                meta: None,
            }
        }
    }
}

/// Structured content must be an object; wrap anything else.
fn structured(payload: Value) -> Value {
    match payload {
        Value::Object(_) => payload,
        other => json!({ "result": other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::server::testing::server;
    use crate::domains::backend::testing::FakeBackend;

    fn envelope(reply: Option<Reply>) -> Envelope {
        match reply {
            Some(Reply::Envelope(e)) => e,
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    fn rpc(reply: Option<Reply>) -> JsonRpcResponse {
        match reply {
            Some(Reply::Rpc(r)) => r,
            other => panic!("expected JSON-RPC reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_direct_invocation() {
        let server = server(&FakeBackend::new().with_indexes(&["main"]));
        let reply = respond(
            &server,
            br#"{"tool_name": "list_indexes", "arguments": {}, "request_id": "r1"}"#,
        )
        .await;

        let envelope = envelope(reply);
        assert!(envelope.success);
        assert_eq!(envelope.request_id, Some(json!("r1")));
        assert_eq!(envelope.result, Some(json!({"indexes": ["main"]})));
    }

    #[tokio::test]
    async fn test_malformed_frames() {
        let server = server(&FakeBackend::new());
        for frame in [
            &b"{not json"[..],
            b"[1, 2, 3]",
            b"\xff\xfe",
            br#"{"arguments": {}}"#,
        ] {
            let envelope = envelope(respond(&server, frame).await);
            assert_eq!(envelope.error_kind(), Some(ErrorKind::ParseError));
        }
    }

    #[test]
    fn test_request_id_recovered_from_bad_frame() {
        let Err(reply) = decode(br#"{"id": 9, "arguments": []}"#) else {
            panic!("frame should not decode");
        };
        assert_eq!(reply.correlation_id(), Some(&json!(9)));
    }

    #[tokio::test]
    async fn test_rpc_initialize_and_list() {
        let server = server(&FakeBackend::new());

        let init = rpc(respond(
            &server,
            br#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#,
        )
        .await);
        let result = init.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "splunk-mcp");

        let list = rpc(respond(&server, br#"{"jsonrpc": "2.0", "id": 2, "method": "tools/list"}"#).await);
        let tools = list.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, server.registry().len());
    }

    #[tokio::test]
    async fn test_rpc_tools_call() {
        let server = server(&FakeBackend::new().with_indexes(&["main", "security"]));
        let reply = rpc(respond(
            &server,
            br#"{"jsonrpc": "2.0", "id": "c1", "method": "tools/call",
                 "params": {"name": "list_indexes", "arguments": {}}}"#,
        )
        .await);

        let result = reply.result.unwrap();
        assert_eq!(reply.id, Some(json!("c1")));
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["indexes"], json!(["main", "security"]));
    }

    #[tokio::test]
    async fn test_rpc_tool_failure_is_flagged() {
        let server = server(&FakeBackend::new());
        let reply = rpc(respond(
            &server,
            br#"{"jsonrpc": "2.0", "id": 3, "method": "tools/call",
                 "params": {"name": "get_index_info", "arguments": {}}}"#,
        )
        .await);

        let result = reply.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["kind"], "invalid_arguments");
    }

    #[tokio::test]
    async fn test_rpc_errors() {
        let server = server(&FakeBackend::new());

        let unknown_tool = rpc(respond(
            &server,
            br#"{"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": {"name": "nope"}}"#,
        )
        .await);
        assert_eq!(unknown_tool.error.unwrap().code, -32602);

        let unknown_method =
            rpc(respond(&server, br#"{"jsonrpc": "2.0", "id": 5, "method": "resources/list"}"#).await);
        assert_eq!(unknown_method.error.unwrap().code, -32601);

        let garbled = rpc(respond(&server, br#"{"jsonrpc": "2.0", "id": 6, "method": "#).await);
        assert_eq!(garbled.error.unwrap().code, -32700);
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let server = server(&FakeBackend::new());
        let reply = respond(
            &server,
            br#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
        )
        .await;
        assert!(reply.is_none());
    }
}
