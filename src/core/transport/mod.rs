//! Transport layer for the tool server.
//!
//! This module provides the transport adapters:
//! - **STDIO**: newline-delimited frames on stdin/stdout - feature: `stdio`
//! - **HTTP**: synchronous REST API, SSE streaming and a JSON-RPC endpoint - feature: `http`
//!
//! Each adapter owns its connection lifecycle and hands every request to
//! [`ToolServer::dispatch`](crate::core::ToolServer::dispatch). Frame decoding
//! shared by STDIO and the SSE companion channel lives in [`protocol`].
//!
//! # Feature Flags
//!
//! - `stdio` (default): STDIO transport - minimal dependencies
//! - `http` (default): HTTP + SSE transport - adds axum, tower, tower-http

mod config;
mod error;
mod service;

pub mod protocol;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "stdio")]
pub mod stdio;

#[cfg(all(test, feature = "stdio", feature = "http"))]
mod conformance;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

#[cfg(feature = "http")]
pub use config::HttpConfig;
