//! Tool-specific error types.

use thiserror::Error;

use super::invocation::{ErrorKind, Failure};
use crate::domains::backend::BackendError;

/// Errors a tool handler can return.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments passed schema validation but are semantically invalid.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Normalize into a transport-neutral failure.
    ///
    /// Backend failures keep their original message as `detail`.
    pub fn into_failure(self) -> Failure {
        match self {
            Self::InvalidArguments(msg) => {
                Failure::new(ErrorKind::InvalidArguments, "Invalid arguments").with_detail(msg)
            }
            Self::Backend(err) => {
                let kind = ErrorKind::from(err.kind);
                Failure::new(kind, backend_message(kind)).with_detail(err.message)
            }
            Self::Internal(msg) => {
                Failure::new(ErrorKind::Internal, "Internal error").with_detail(msg)
            }
        }
    }
}

fn backend_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Unauthorized => "Backend rejected the credentials",
        ErrorKind::Forbidden => "Operation not permitted for this user",
        ErrorKind::NotFound => "Requested resource was not found",
        ErrorKind::InvalidArguments => "Backend rejected the request",
        ErrorKind::Timeout => "Backend did not respond in time",
        ErrorKind::Unavailable => "Backend is unavailable",
        _ => "Backend call failed",
    }
}

/// Errors raised while building the tool registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A tool with the same name is already registered.
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),
}
