//! Harness for exercising a single tool handler against a fake backend.

use serde_json::Value;
use std::sync::Arc;

use crate::domains::backend::testing::FakeBackend;
use crate::domains::backend::{BackendAdapter, RetryPolicy};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::handlers::{ServerIdentity, ToolContext, ToolOutcome};
use crate::domains::tools::registry::ToolRegistry;

/// Validate `args` against `descriptor` and run its handler.
pub async fn run(fake: &FakeBackend, descriptor: ToolDescriptor, args: Value) -> ToolOutcome {
    let registry = ToolRegistry::with_builtin_tools().unwrap();
    let backend = BackendAdapter::new(Arc::new(fake.clone()), RetryPolicy::default());
    let identity = ServerIdentity {
        name: "splunk-mcp".to_string(),
        version: "1.2.3".to_string(),
    };
    let ctx = ToolContext {
        backend: &backend,
        registry: &registry,
        identity: &identity,
    };

    let args = descriptor
        .validate(args.as_object().cloned().unwrap_or_default())
        .unwrap();
    descriptor.handler().call(&ctx, args).await
}
