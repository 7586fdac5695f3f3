//! Splunk tools module.
//!
//! Tools that reach the backend through the retrying adapter:
//! - `search`: one-shot search jobs
//! - `indexes`: index listing, metadata and sourcetype summary
//! - `saved_searches`: saved search listing
//! - `users`: current user and user listing
//! - `kvstore`: KV store collection management
//! - `health`: connection summary and installed apps

pub mod health;
pub mod indexes;
pub mod kvstore;
pub mod saved_searches;
pub mod search;
pub mod users;

pub use health::HealthCheckTool;
pub use indexes::{GetIndexInfoTool, IndexesAndSourcetypesTool, ListIndexesTool};
pub use kvstore::{CreateKvStoreCollectionTool, DeleteKvStoreCollectionTool, ListKvStoreCollectionsTool};
pub use saved_searches::ListSavedSearchesTool;
pub use search::{SearchParams, SearchTool};
pub use users::{CurrentUserTool, ListUsersTool, UserInfo};
