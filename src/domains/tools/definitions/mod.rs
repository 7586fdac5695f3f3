//! Tool definitions module.
//!
//! Each tool lives in its own file and exposes a `descriptor()` that pairs
//! its parameters with its handler. [`all`] lists every built-in tool in the
//! order the registry advertises them.

pub mod server;
pub mod splunk;

#[cfg(test)]
pub(crate) mod testing;

pub use server::{ListToolsTool, PingTool};
pub use splunk::{
    CreateKvStoreCollectionTool, CurrentUserTool, DeleteKvStoreCollectionTool, GetIndexInfoTool,
    HealthCheckTool, IndexesAndSourcetypesTool, ListIndexesTool, ListKvStoreCollectionsTool,
    ListSavedSearchesTool, ListUsersTool, SearchTool,
};

use super::descriptor::ToolDescriptor;

/// Descriptors of every built-in tool.
pub fn all() -> Vec<ToolDescriptor> {
    let mut tools = vec![
        SearchTool::descriptor(),
        ListIndexesTool::descriptor(),
        GetIndexInfoTool::descriptor(),
        IndexesAndSourcetypesTool::descriptor(),
        ListSavedSearchesTool::descriptor(),
        CurrentUserTool::descriptor(),
        ListUsersTool::descriptor(),
        ListKvStoreCollectionsTool::descriptor(),
        CreateKvStoreCollectionTool::descriptor(),
        DeleteKvStoreCollectionTool::descriptor(),
    ];
    tools.extend(HealthCheckTool::descriptors());
    tools.push(ListToolsTool::descriptor());
    tools.push(PingTool::descriptor());
    tools
}
