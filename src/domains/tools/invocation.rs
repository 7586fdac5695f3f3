//! Invocation requests, outcomes and the wire envelope.
//!
//! [`InvocationResult`] is what the dispatcher produces; [`Envelope`] is the
//! uniform shape every transport puts on the wire, whatever its status code
//! or framing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domains::backend::BackendErrorKind;

/// Transport-neutral failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    InvalidArguments,
    Unauthorized,
    Forbidden,
    NotFound,
    Timeout,
    Unavailable,
    ParseError,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown_tool",
            Self::InvalidArguments => "invalid_arguments",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::ParseError => "parse_error",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<BackendErrorKind> for ErrorKind {
    fn from(kind: BackendErrorKind) -> Self {
        match kind {
            BackendErrorKind::AuthFailure => Self::Unauthorized,
            BackendErrorKind::PermissionDenied => Self::Forbidden,
            BackendErrorKind::NotFound => Self::NotFound,
            BackendErrorKind::InvalidArgument => Self::InvalidArguments,
            BackendErrorKind::Timeout => Self::Timeout,
            BackendErrorKind::ConnectionFailure | BackendErrorKind::Unavailable => {
                Self::Unavailable
            }
        }
    }
}

/// One request to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    #[serde(alias = "tool")]
    pub tool_name: String,
    #[serde(default, alias = "parameters")]
    pub arguments: Map<String, Value>,
    /// Opaque correlation id, echoed back in the response envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
}

impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<Value>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Details of a failed invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Failure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// The outcome of dispatching an [`InvocationRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success { payload: Value },
    Failure(Failure),
}

impl InvocationResult {
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure(Failure::new(kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure kind, if this is a failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(f) => Some(f.kind),
        }
    }

    /// Wrap into the wire envelope, attaching the request's correlation id.
    pub fn into_envelope(self, request_id: Option<Value>) -> Envelope {
        match self {
            Self::Success { payload } => Envelope {
                request_id,
                success: true,
                result: Some(payload),
                error: None,
            },
            Self::Failure(failure) => Envelope {
                request_id,
                success: false,
                result: None,
                error: Some(failure),
            },
        }
    }
}

impl From<Failure> for InvocationResult {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

/// Uniform response body: `{ request_id?, success, result?, error? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

impl Envelope {
    /// A failure envelope produced outside the dispatcher (framing errors).
    pub fn failure(request_id: Option<Value>, failure: Failure) -> Self {
        InvocationResult::Failure(failure).into_envelope(request_id)
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
