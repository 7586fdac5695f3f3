//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server,
//! including error handling, configuration, the server handle shared by every
//! transport, and the transport adapters themselves.

pub mod config;
pub mod error;
pub mod server;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use server::ToolServer;
pub use transport::{TransportConfig, TransportService};
