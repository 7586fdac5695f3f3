//! Splunk MCP Server Library
//!
//! Exposes Splunk operations (searches, indexes, users, saved searches,
//! KV store collections, health) as named tools, reachable over three
//! transports that share one dispatch core.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the [`ToolServer`] handle and the
//!   transport adapters (STDIO, synchronous HTTP API, SSE streaming)
//! - **domains**: business logic organized by bounded contexts
//!   - **backend**: Splunk REST client behind the `BackendConnector` trait, with retry
//!   - **tools**: descriptors, registry, handlers and the dispatcher
//!
//! # Example
//!
//! ```rust,no_run
//! use splunk_mcp_server::core::{Config, ToolServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = ToolServer::new(config.clone())?;
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, Result, ToolServer};
