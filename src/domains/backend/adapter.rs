//! Uniform call interface over the backend connector.
//!
//! Every backend operation a tool performs goes through
//! [`BackendAdapter::invoke`], which owns session acquisition and the retry
//! policy: transient failures are retried exactly once after a capped backoff,
//! permanent failures are returned immediately. Writes that are not
//! idempotent use [`BackendAdapter::invoke_once`] and are never retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::BackendResult;
use super::model::ConnectionInfo;
use super::session::{BackendConnector, BackendSession};

/// Backoff settings for transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Transient failures are retried at most this many times.
    pub const MAX_RETRIES: u32 = 1;

    pub fn new(initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            initial_backoff,
            max_backoff,
        }
    }

    /// Delay before retry number `attempt` (zero-based), capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(2))
    }
}

/// Wraps a [`BackendConnector`] behind a single retrying call interface.
pub struct BackendAdapter {
    connector: Arc<dyn BackendConnector>,
    retry: RetryPolicy,
}

impl BackendAdapter {
    pub fn new(connector: Arc<dyn BackendConnector>, retry: RetryPolicy) -> Self {
        Self { connector, retry }
    }

    /// Describe the backend endpoint.
    pub fn info(&self) -> ConnectionInfo {
        self.connector.info()
    }

    /// Run `call` against a fresh session.
    ///
    /// `operation` labels the call in logs. The closure may be invoked twice
    /// when the first attempt fails transiently.
    pub async fn invoke<T, F, Fut>(&self, operation: &'static str, call: F) -> BackendResult<T>
    where
        F: Fn(Arc<dyn BackendSession>) -> Fut + Send + Sync,
        Fut: Future<Output = BackendResult<T>> + Send,
        T: Send,
    {
        self.run(operation, RetryPolicy::MAX_RETRIES, call).await
    }

    /// Run `call` exactly once, whatever the failure.
    ///
    /// For non-idempotent writes: a timed-out create may already have been
    /// applied, and repeating it would turn success into a conflict.
    pub async fn invoke_once<T, F, Fut>(&self, operation: &'static str, call: F) -> BackendResult<T>
    where
        F: Fn(Arc<dyn BackendSession>) -> Fut + Send + Sync,
        Fut: Future<Output = BackendResult<T>> + Send,
        T: Send,
    {
        self.run(operation, 0, call).await
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, max_retries: u32, call: F) -> BackendResult<T>
    where
        F: Fn(Arc<dyn BackendSession>) -> Fut + Send + Sync,
        Fut: Future<Output = BackendResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            let outcome = match self.connector.connect().await {
                Ok(session) => call(session).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(value) => {
                    debug!(operation, attempt, "Backend call succeeded");
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient backend failure, retrying: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(operation, attempt, "Backend call failed: {}", err);
                    return Err(err);
                }
            }
        }
    }
}
