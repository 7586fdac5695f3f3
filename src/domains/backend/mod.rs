//! Backend domain module.
//!
//! Everything the tools know about Splunk lives behind the traits in this
//! module. Handlers never talk to a session directly: they go through
//! [`BackendAdapter::invoke`], which owns session acquisition and retries.
//!
//! ## Architecture
//!
//! - `session.rs` - `BackendConnector` / `BackendSession` traits
//! - `adapter.rs` - Retrying call interface used by tool handlers
//! - `splunk.rs` - Splunk REST implementation over `reqwest`
//! - `model.rs` - Entities and search requests
//! - `error.rs` - Typed backend failures

mod adapter;
mod error;
mod model;
mod session;
mod splunk;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{BackendAdapter, RetryPolicy};
pub use error::{BackendError, BackendErrorKind, BackendResult};
pub use model::{ConnectionInfo, Entity, EntityKind, SearchRequest, SearchRow};
pub use session::{BackendConnector, BackendSession};
pub use splunk::SplunkConnector;
