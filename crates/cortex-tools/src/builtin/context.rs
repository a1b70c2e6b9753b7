//! Context answering tool

use async_trait::async_trait;
use cortex_core::{ConversationTurn, ExplicitContext, StepOutputs, ToolResult};
use cortex_llm::prompts::build_context_answer_prompt;
use serde_json::{json, Map, Value};
use tracing::info;

use super::CONTEXT_TOOL;
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::tool::{Tool, ToolParameter};

/// Answers from explicit nodes and earlier results, never touching the store
pub struct AnswerFromContextTool;

#[async_trait]
impl Tool for AnswerFromContextTool {
    fn name(&self) -> &str {
        CONTEXT_TOOL
    }

    fn description(&self) -> &str {
        "Answer the question using only the provided context (explicit nodes or previous query results) without executing a database query. Use this when the context already contains enough information to answer the question."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![ToolParameter::required(
            "message",
            "string",
            "The user's question to answer using context",
        )]
    }

    async fn execute(
        &self,
        params: &Map<String, Value>,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let Some(message) = params
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
        else {
            return Ok(ToolResult::failure("Message parameter is required"));
        };

        info!(request_id = %ctx.request_id, "Answering from context tool");

        let Some(context) = build_context(ctx.explicit_context.as_ref(), &ctx.history) else {
            return Ok(ToolResult::failure("No context available to answer from"));
        };

        let prompt = build_context_answer_prompt(&context, message);
        let answer = ctx.llm.generate(&prompt).await?.content.trim().to_string();

        info!(request_id = %ctx.request_id, "Answer from context tool completed");
        Ok(ToolResult::success(json!({ "answer": answer }), StepOutputs::text(answer)))
    }
}

/// Render pinned nodes and earlier result sets; `None` when there are neither
fn build_context(
    explicit: Option<&ExplicitContext>,
    history: &[ConversationTurn],
) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(explicit) = explicit.filter(|c| !c.is_empty()) {
        parts.push("Explicit context nodes:".to_string());
        for (i, node) in explicit.nodes.iter().enumerate() {
            let labels = node
                .labels
                .as_ref()
                .map(|l| l.join(":"))
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| "Node".to_string());
            let props = node
                .properties
                .as_ref()
                .and_then(|p| serde_json::to_string_pretty(p).ok())
                .unwrap_or_else(|| "{}".to_string());
            parts.push(format!("{}. {}: {}", i + 1, labels, props));
        }
    }

    let previous: Vec<&ConversationTurn> = history
        .iter()
        .filter(|turn| turn.results.as_ref().map(|r| !r.is_empty()).unwrap_or(false))
        .collect();

    if !previous.is_empty() {
        parts.push("\nPrevious query results:".to_string());
        for (i, turn) in previous.iter().enumerate() {
            parts.push(format!("{}. Question: \"{}\"", i + 1, turn.content));
            if let Some(query) = &turn.query {
                parts.push(format!("   Query: {}", query));
            }
            let results = serde_json::to_string_pretty(&turn.results).unwrap_or_default();
            parts.push(format!("   Results: {}", results));
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}
