//! cortex-tools: tools the planner can choose from
//!
//! - [`Tool`]: the capability interface every tool implements
//! - [`ToolRegistry`]: name -> tool lookup, built once at startup
//! - [`ToolExecutor`]: runs a tool inside a published step lifecycle

pub mod builtin;
pub mod context;
pub mod error;
pub mod executor;
pub mod registry;
pub mod tool;

#[cfg(test)]
mod testing;

pub use builtin::{
    register_builtin_tools, AnswerFromContextTool, ExecuteQueryTool, CONTEXT_TOOL, QUERY_TOOL,
};
pub use context::ToolContext;
pub use error::{RegistryError, ToolError};
pub use executor::{ExecutedTool, ToolExecutor};
pub use registry::ToolRegistry;
pub use tool::{BoxedTool, SimpleTool, Tool, ToolParameter};
