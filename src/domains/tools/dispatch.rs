//! Dispatch core.
//!
//! [`Dispatcher::dispatch`] is the single entry point every transport uses:
//! resolve the tool, validate its arguments, run the handler under a deadline
//! and normalize whatever happens into an [`InvocationResult`].

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::handlers::{ServerIdentity, ToolContext};
use super::invocation::{ErrorKind, Failure, InvocationRequest, InvocationResult};
use super::registry::ToolRegistry;
use crate::domains::backend::BackendAdapter;

/// Routes invocation requests to tool handlers.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    backend: Arc<BackendAdapter>,
    identity: ServerIdentity,
    deadline: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        backend: Arc<BackendAdapter>,
        identity: ServerIdentity,
        deadline: Duration,
    ) -> Self {
        Self {
            registry,
            backend,
            identity,
            deadline,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run one invocation to completion.
    ///
    /// Never fails and never blocks past the deadline: unknown tools, invalid
    /// arguments, handler errors, panics and timeouts all come back as
    /// [`InvocationResult::Failure`].
    #[instrument(skip_all, fields(tool = %request.tool_name))]
    pub async fn dispatch(&self, request: InvocationRequest) -> InvocationResult {
        let Some(descriptor) = self.registry.resolve(&request.tool_name) else {
            warn!("Unknown tool requested");
            return InvocationResult::failure(
                ErrorKind::UnknownTool,
                format!("Unknown tool: {}", request.tool_name),
            );
        };

        let arguments = match descriptor.validate(request.arguments) {
            Ok(arguments) => arguments,
            Err(e) => {
                debug!(problems = ?e.problems, "Argument validation failed");
                return Failure::new(ErrorKind::InvalidArguments, "Invalid arguments")
                    .with_detail(e.to_string())
                    .into();
            }
        };

        let ctx = ToolContext {
            backend: &self.backend,
            registry: &self.registry,
            identity: &self.identity,
        };
        let call = AssertUnwindSafe(descriptor.handler().call(&ctx, arguments)).catch_unwind();

        match tokio::time::timeout(self.deadline, call).await {
            Ok(Ok(Ok(payload))) => {
                debug!("Tool call succeeded");
                InvocationResult::success(payload)
            }
            Ok(Ok(Err(e))) => {
                warn!("Tool call failed: {}", e);
                e.into_failure().into()
            }
            Ok(Err(panic)) => {
                let detail = panic_message(panic.as_ref());
                error!("Tool handler panicked: {}", detail);
                Failure::new(ErrorKind::Internal, "Internal error")
                    .with_detail(detail)
                    .into()
            }
            Err(_) => {
                warn!(deadline_ms = self.deadline.as_millis() as u64, "Tool call timed out");
                InvocationResult::failure(
                    ErrorKind::Timeout,
                    format!(
                        "Tool '{}' did not finish within {} ms",
                        descriptor.name(),
                        self.deadline.as_millis()
                    ),
                )
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
