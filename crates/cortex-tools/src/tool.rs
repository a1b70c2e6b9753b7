//! Core Tool trait and types
//!
//! Defines the interface every planner-selectable tool implements.

use async_trait::async_trait;
use cortex_core::ToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::context::ToolContext;
use crate::error::ToolError;

/// One named input of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ToolParameter {
    pub fn required(name: &str, kind: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, kind: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Core trait for all tools
///
/// Tools are stateless between invocations. A returned `Err` and a
/// `ToolResult` with `success = false` are both reported as a failed step;
/// the error variant additionally lets the caller classify the failure.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier; never changes once registered
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> Vec<ToolParameter> {
        Vec::new()
    }

    async fn execute(
        &self,
        params: &Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError>;
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

type Handler = dyn Fn(&Map<String, Value>) -> Result<ToolResult, ToolError> + Send + Sync;

/// Closure-backed tool, handy for tests and one-off registrations
#[derive(Clone)]
pub struct SimpleTool {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
    handler: Arc<Handler>,
}

impl SimpleTool {
    pub fn new<F>(name: &str, description: &str, parameters: Vec<ToolParameter>, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<ToolResult, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl Tool for SimpleTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        self.parameters.clone()
    }

    async fn execute(
        &self,
        params: &Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        (self.handler)(params)
    }
}
