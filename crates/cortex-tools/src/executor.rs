//! Tool executor with step publishing
//!
//! Every invocation is observable as exactly two step events on the
//! request's topic: `RUNNING`, then `COMPLETED` or `ERROR`. Failures,
//! including panics inside the tool, are captured and returned, never
//! propagated.

use cortex_core::{step_topic, Step, StepUpdateEvent, ToolResult};
use cortex_events::StepBus;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{error, info, Instrument};

use crate::builtin::{CONTEXT_TOOL, QUERY_TOOL};
use crate::context::ToolContext;
use crate::error::ToolError;
use crate::tool::Tool;

/// Outcome of one tool invocation
#[derive(Debug, Clone)]
pub struct ExecutedTool {
    pub result: ToolResult,
    /// The terminal step that was published
    pub step: Step,
    /// Typed cause when the tool returned `Err` or panicked
    pub error: Option<ToolError>,
}

impl ExecutedTool {
    pub fn succeeded(&self) -> bool {
        self.result.success
    }
}

#[derive(Clone)]
pub struct ToolExecutor {
    bus: StepBus,
}

impl ToolExecutor {
    pub fn new(bus: StepBus) -> Self {
        Self { bus }
    }

    /// Run `tool` inside a `tool:<name>` step
    pub async fn execute_tool(
        &self,
        tool: &dyn Tool,
        params: &Map<String, Value>,
        ctx: &ToolContext,
    ) -> ExecutedTool {
        let running = Step::running(format!("tool:{}", tool.name()), step_name(tool.name()));
        self.publish(&ctx.request_id, &running);

        let start = Instant::now();
        let outcome = AssertUnwindSafe(tool.execute(params, ctx).instrument(ctx.span.clone()))
            .catch_unwind()
            .await;
        let duration = start.elapsed().as_secs_f64();

        let (result, error) = match outcome {
            Ok(Ok(result)) => (result, None),
            Ok(Err(e)) => (ToolResult::failure(e.to_string()), Some(e)),
            Err(panic) => {
                let e = ToolError::Panicked(panic_message(panic.as_ref()));
                (ToolResult::failure(e.to_string()), Some(e))
            }
        };

        let step = if result.success {
            info!(
                tool = %tool.name(),
                duration,
                request_id = %ctx.request_id,
                "Tool executed successfully"
            );
            running.completed(duration, result.artifacts.clone())
        } else {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "Tool execution failed".to_string());
            error!(
                tool = %tool.name(),
                error = %message,
                request_id = %ctx.request_id,
                "Tool execution failed"
            );
            running.failed(duration, message)
        };

        self.publish(&ctx.request_id, &step);
        ExecutedTool { result, step, error }
    }

    fn publish(&self, request_id: &str, step: &Step) {
        self.bus.publish(
            &step_topic(request_id),
            StepUpdateEvent {
                request_id: request_id.to_string(),
                step: step.clone(),
            },
        );
    }
}

/// Human-readable step label for a tool name
pub fn step_name(tool_name: &str) -> String {
    match tool_name {
        QUERY_TOOL => "Executing query".to_string(),
        CONTEXT_TOOL => "Answering from context".to_string(),
        other => other
            .replace('_', " ")
            .split(' ')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" "),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
