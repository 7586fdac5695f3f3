//! Tools domain module.
//!
//! Tools are named operations clients invoke through any transport. Every
//! invocation goes through the [`Dispatcher`], which resolves the tool in the
//! [`ToolRegistry`], validates arguments against its [`ToolDescriptor`] and
//! normalizes the outcome into an [`InvocationResult`].
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations
//! - `descriptor.rs` - Parameter specs and argument validation
//! - `registry.rs` - Name to descriptor catalog, built once at startup
//! - `dispatch.rs` - Deadline-bound dispatch core
//! - `invocation.rs` - Requests, results, error kinds and the wire envelope
//! - `handlers.rs` - Handler trait and context
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/` with a unit struct implementing
//!    `ToolHandler` and a `descriptor()` constructor
//! 2. Export it in the parent `mod.rs`
//! 3. Add its descriptor to `definitions::all()`

pub mod definitions;
mod descriptor;
mod dispatch;
mod error;
mod handlers;
mod invocation;
mod registry;

pub use descriptor::{ParamSpec, ParamType, ToolDescriptor, ValidationError};
pub use dispatch::Dispatcher;
pub use error::{RegistryError, ToolError};
pub use handlers::*;
pub use invocation::{Envelope, ErrorKind, Failure, InvocationRequest, InvocationResult};
pub use registry::ToolRegistry;
