//! Graph schema introspection
//!
//! [`SchemaCache`] memoizes the store's shape for the life of the process;
//! [`GraphSchema::format_for_prompt`] renders it for language model prompts.

pub mod cache;
pub mod schema;

pub use cache::{CountEntry, SchemaCache, SchemaCounts};
pub use schema::{GraphSchema, PropertySchema};
