//! Built-in tools
//!
//! - `execute_cypher_query`: run a graph query, return rows
//! - `answer_from_context`: answer from pinned nodes and earlier results only

mod context;
mod query;

pub use context::AnswerFromContextTool;
pub use query::ExecuteQueryTool;

use std::sync::Arc;

use crate::error::RegistryError;
use crate::registry::ToolRegistry;

pub const QUERY_TOOL: &str = "execute_cypher_query";
pub const CONTEXT_TOOL: &str = "answer_from_context";

/// Register every built-in tool
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(Arc::new(ExecuteQueryTool))?;
    registry.register(Arc::new(AnswerFromContextTool))?;
    Ok(())
}
