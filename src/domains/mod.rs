//! Domains module containing business logic organized by bounded contexts.
//!
//! - **backend**: the Splunk client, its retry policy and the scripted test double
//! - **tools**: tool descriptors, the registry, the handlers and the dispatch core

pub mod backend;
pub mod tools;
