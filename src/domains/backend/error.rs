//! Backend failure types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Classification of a backend failure.
///
/// Every failure the Splunk client can produce is folded into one of these
/// kinds, so callers can decide on retries and error mapping without looking
/// at transport-specific details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// Credentials were rejected.
    AuthFailure,
    /// The requested entity does not exist.
    NotFound,
    /// The authenticated principal lacks the required capability.
    PermissionDenied,
    /// The backend did not answer in time.
    Timeout,
    /// No connection could be established.
    ConnectionFailure,
    /// The backend rejected the request as malformed.
    InvalidArgument,
    /// The backend answered but cannot serve the request right now.
    Unavailable,
}

impl BackendErrorKind {
    /// Whether a failure of this kind may succeed when attempted again.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailure)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthFailure => "auth_failure",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Timeout => "timeout",
            Self::ConnectionFailure => "connection_failure",
            Self::InvalidArgument => "invalid_argument",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::AuthFailure, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::PermissionDenied, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Timeout, message)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::ConnectionFailure, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidArgument, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unavailable, message)
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeouts_and_connection_failures_are_transient() {
        let transient: Vec<_> = [
            BackendErrorKind::AuthFailure,
            BackendErrorKind::NotFound,
            BackendErrorKind::PermissionDenied,
            BackendErrorKind::Timeout,
            BackendErrorKind::ConnectionFailure,
            BackendErrorKind::InvalidArgument,
            BackendErrorKind::Unavailable,
        ]
        .into_iter()
        .filter(|k| k.is_transient())
        .collect();

        assert_eq!(
            transient,
            vec![BackendErrorKind::Timeout, BackendErrorKind::ConnectionFailure]
        );
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = BackendError::not_found("Index not found: nope");
        assert_eq!(err.to_string(), "not_found: Index not found: nope");
    }
}
