//! Server introspection tools. None of these reach the backend.

pub mod list_tools;
pub mod ping;

pub use list_tools::ListToolsTool;
pub use ping::PingTool;
