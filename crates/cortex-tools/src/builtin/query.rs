//! Graph query tool

use async_trait::async_trait;
use cortex_core::{StepOutputs, ToolResult};
use serde_json::{Map, Value};
use tracing::info;

use super::QUERY_TOOL;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::tool::{Tool, ToolParameter};

/// Runs a Cypher statement on the request's session
pub struct ExecuteQueryTool;

#[async_trait]
impl Tool for ExecuteQueryTool {
    fn name(&self) -> &str {
        QUERY_TOOL
    }

    fn description(&self) -> &str {
        "Execute a Cypher query to search the graph database. Use this when you need to find nodes, relationships, or analyze graph patterns."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required("query", "string", "The Cypher query to execute")]
    }

    async fn execute(
        &self,
        params: &Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let Some(query) = params
            .get("query")
            .and_then(Value::as_str)
            .filter(|q| !q.is_empty())
        else {
            return Ok(ToolResult::failure("Query parameter is required and must be a string"));
        };

        info!(query = %query, request_id = %ctx.request_id, "Executing Cypher query tool");
        let rows = ctx.session.run(query).await?;
        info!(
            result_count = rows.len(),
            request_id = %ctx.request_id,
            "Cypher query tool executed successfully"
        );

        let data = Value::Array(rows.iter().cloned().map(Value::Object).collect());
        Ok(ToolResult::success(data, StepOutputs::results(rows)))
    }
}
