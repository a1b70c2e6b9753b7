//! Chat orchestration pipeline
//!
//! Drives one request through planning, tool validation, one execution
//! branch and response synthesis. The caller always gets a
//! [`ChatResponse`]; failures become user-facing text at a single point
//! in [`ChatPipeline::handle_request`].

use cortex_core::{
    ContextNode, ConversationTurn, ExplicitContext, PlanResult, Row, Step, StepOutputs,
};
use cortex_events::StepBus;
use cortex_graph::{GraphDriver, GraphError};
use cortex_introspection::SchemaCache;
use cortex_llm::{LanguageModel, LlmAgent, Planner, QueryGenerator, ResponseSynthesizer};
use cortex_tools::{
    ExecutedTool, ToolContext, ToolError, ToolExecutor, ToolRegistry, CONTEXT_TOOL, QUERY_TOOL,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::format::format_query_response;
use crate::trace::StepTrace;

/// An incoming chat message plus whatever context the client holds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub context_nodes: Vec<ContextNode>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// Final answer with the full step trace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub request_id: String,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Query that produced `results`, kept by clients for follow-up turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Row>>,
}

/// What a successful branch hands back
struct Answer {
    text: String,
    query: Option<String>,
    results: Option<Vec<Row>>,
}

pub struct ChatPipeline {
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    bus: StepBus,
    driver: Arc<dyn GraphDriver>,
    schema: Arc<SchemaCache>,
    llm: Arc<dyn LanguageModel>,
    planner: Arc<dyn Planner>,
    query_generator: Arc<dyn QueryGenerator>,
    synthesizer: Arc<dyn ResponseSynthesizer>,
}

impl ChatPipeline {
    /// Build a pipeline whose planner, generator and synthesizer are all
    /// prompt-driven over `llm`
    pub fn new(
        registry: Arc<ToolRegistry>,
        bus: StepBus,
        driver: Arc<dyn GraphDriver>,
        schema: Arc<SchemaCache>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        let agent = Arc::new(LlmAgent::new(llm.clone()));
        Self {
            registry,
            executor: ToolExecutor::new(bus.clone()),
            bus,
            driver,
            schema,
            llm,
            planner: agent.clone(),
            query_generator: agent.clone(),
            synthesizer: agent,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_query_generator(mut self, generator: Arc<dyn QueryGenerator>) -> Self {
        self.query_generator = generator;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn ResponseSynthesizer>) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn bus(&self) -> &StepBus {
        &self.bus
    }

    /// Answer a bare message
    pub async fn handle(&self, message: &str, request_id: Option<String>) -> ChatResponse {
        self.handle_request(ChatRequest {
            message: message.to_string(),
            request_id,
            ..Default::default()
        })
        .await
    }

    /// Answer a message with its conversation context
    pub async fn handle_request(&self, request: ChatRequest) -> ChatResponse {
        let request_id = request
            .request_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let span = info_span!("chat_request", request_id = %request_id);

        async move {
            info!(message = %request.message, "Processing chat request");
            let mut trace = StepTrace::new(self.bus.clone(), &request_id);

            let outcome = self.run(&request, &request_id, &mut trace).await;
            let (response, query, results) = match outcome {
                Ok(answer) => (answer.text, answer.query, answer.results),
                Err(e) => {
                    error!(error = %e, "Chat request failed");
                    trace.fail_open_step(&e.to_string());
                    (e.user_message(self.llm.endpoint()), None, None)
                }
            };

            let steps = trace.into_steps();
            info!(steps = steps.len(), "Chat request finished");
            ChatResponse {
                response,
                request_id: request_id.clone(),
                steps,
                conversation_id: request.conversation_id.clone(),
                query,
                results,
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &ChatRequest,
        request_id: &str,
        trace: &mut StepTrace,
    ) -> Result<Answer, PipelineError> {
        // Held until this function returns; dropping the last clone frees the pool slot
        let session = self.driver.session().await.map_err(|e| {
            PipelineError::Unavailable(match e {
                GraphError::Unavailable(_) => e,
                other => GraphError::unavailable(other.to_string()),
            })
        })?;

        // Cold-cache introspection runs on this session; a request holds one pool slot
        let schema = self.schema.introspect_with(session.as_ref(), false).await;
        let schema_text = (!schema.is_empty()).then(|| schema.format_for_prompt());

        let plan = self.plan(request, schema_text.as_deref(), trace).await?;
        let tools = self.validate_tools(&plan);

        let explicit = (!request.context_nodes.is_empty()).then(|| ExplicitContext {
            nodes: request.context_nodes.clone(),
        });
        let ctx = ToolContext::new(request_id, session, self.llm.clone())
            .with_span(Span::current())
            .with_explicit_context(explicit)
            .with_history(request.conversation_history.clone());

        if tools.first().map(String::as_str) == Some(CONTEXT_TOOL) {
            self.answer_from_context(request, &plan, &ctx, trace).await
        } else {
            self.answer_with_query(request, &plan, schema_text.as_deref(), &ctx, trace)
                .await
        }
    }

    async fn plan(
        &self,
        request: &ChatRequest,
        schema: Option<&str>,
        trace: &mut StepTrace,
    ) -> Result<PlanResult, PipelineError> {
        trace.begin("planning", "Planning");
        let plan = self
            .planner
            .plan(
                &request.message,
                &self.registry.describe_all(),
                schema,
                &request.conversation_history,
            )
            .await?;

        info!(tools = ?plan.tools, reasoning = %plan.reasoning, "Planning completed");
        trace.complete(Some(StepOutputs::plan(plan.clone())));
        Ok(plan)
    }

    /// Registered tools from the plan, first occurrence only. Falls back
    /// to the query tool when nothing usable was chosen.
    fn validate_tools(&self, plan: &PlanResult) -> Vec<String> {
        let mut valid: Vec<String> = Vec::new();
        for name in &plan.tools {
            if !self.registry.has(name) {
                warn!(tool = %name, "Planner selected an unregistered tool");
            } else if !valid.contains(name) {
                valid.push(name.clone());
            }
        }

        if valid.is_empty() {
            warn!("No valid tools selected, falling back to {}", QUERY_TOOL);
            valid.push(QUERY_TOOL.to_string());
        }
        valid
    }

    async fn answer_with_query(
        &self,
        request: &ChatRequest,
        plan: &PlanResult,
        schema: Option<&str>,
        ctx: &ToolContext,
        trace: &mut StepTrace,
    ) -> Result<Answer, PipelineError> {
        trace.begin("generate_query", "Generating query");
        let generated = self.query_generator.generate_query(&request.message, schema).await?;
        let query = generated.trim().to_string();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }
        if !looks_like_cypher(&query) {
            warn!(query = %query, "Generated query does not start with a Cypher clause");
        }
        info!(query = %query, "Generated Cypher query");
        trace.complete(Some(StepOutputs::query(query.clone())));

        let mut params = plan.parameters.get(QUERY_TOOL).cloned().unwrap_or_default();
        params.insert("query".to_string(), Value::String(query.clone()));
        let executed = self.execute(QUERY_TOOL, &params, ctx, trace).await?;
        let rows = rows_from(&executed);

        trace.begin("response", "Generating response");
        let text = match self.synthesizer.synthesize(&request.message, &rows, Some(&query)).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => format_query_response(&rows),
            Err(e) => {
                warn!(error = %e, "Response synthesis failed, using formatted results");
                format_query_response(&rows)
            }
        };
        trace.complete(Some(StepOutputs::text(text.clone())));

        Ok(Answer {
            text,
            query: Some(query),
            results: Some(rows),
        })
    }

    async fn answer_from_context(
        &self,
        request: &ChatRequest,
        plan: &PlanResult,
        ctx: &ToolContext,
        trace: &mut StepTrace,
    ) -> Result<Answer, PipelineError> {
        let mut params = plan.parameters.get(CONTEXT_TOOL).cloned().unwrap_or_default();
        params
            .entry("message")
            .or_insert_with(|| Value::String(request.message.clone()));
        let executed = self.execute(CONTEXT_TOOL, &params, ctx, trace).await?;

        trace.begin("response", "Generating response");
        let text = executed
            .result
            .artifacts
            .as_ref()
            .and_then(|a| a.text.clone())
            .or_else(|| {
                executed
                    .result
                    .data
                    .as_ref()
                    .and_then(|d| d.get("answer"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_default();
        trace.complete(Some(StepOutputs::text(text.clone())));

        Ok(Answer {
            text,
            query: None,
            results: None,
        })
    }

    /// Run a registered tool and record its step; an unsuccessful result
    /// fails the request
    async fn execute(
        &self,
        name: &str,
        params: &Map<String, Value>,
        ctx: &ToolContext,
        trace: &mut StepTrace,
    ) -> Result<ExecutedTool, PipelineError> {
        let tool = self
            .registry
            .get(name)
            .ok_or_else(|| PipelineError::ToolNotFound(name.to_string()))?;

        let executed = self.executor.execute_tool(tool.as_ref(), params, ctx).await;
        trace.record(executed.step.clone());

        if executed.succeeded() {
            return Ok(executed);
        }
        let cause = executed.error.clone().unwrap_or_else(|| {
            ToolError::failed(
                executed
                    .result
                    .error
                    .clone()
                    .unwrap_or_else(|| "Tool execution failed".to_string()),
            )
        });
        Err(cause.into())
    }
}

/// Whether `query` opens with a Cypher clause keyword
fn looks_like_cypher(query: &str) -> bool {
    if let Ok(re) = Regex::new(r"(?i)^\s*(MATCH|CREATE|MERGE|RETURN|CALL)\b") {
        re.is_match(query)
    } else {
        true
    }
}

fn rows_from(executed: &ExecutedTool) -> Vec<Row> {
    if let Some(rows) = executed
        .result
        .artifacts
        .as_ref()
        .and_then(|a| a.results.as_ref())
        .and_then(|r| r.data.clone())
    {
        return rows;
    }

    match &executed.result.data {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}
