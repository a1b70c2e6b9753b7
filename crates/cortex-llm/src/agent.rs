//! Planner, query generator and response synthesizer
//!
//! The chat pipeline depends only on these three traits. [`LlmAgent`]
//! implements all of them on top of a single [`LanguageModel`].

use async_trait::async_trait;
use cortex_core::{ConversationTurn, PlanResult, Row};
use std::sync::Arc;
use tracing::debug;

use crate::error::LlmError;
use crate::parsing::{extract_cypher_query, parse_planning_response};
use crate::prompts::{build_cypher_prompt, build_planning_prompt, build_response_prompt};
use crate::provider::LanguageModel;

/// Chooses which tools answer a message
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(
        &self,
        message: &str,
        tool_catalogue: &str,
        schema: Option<&str>,
        history: &[ConversationTurn],
    ) -> Result<PlanResult, LlmError>;
}

/// Turns a question into a graph query
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate_query(&self, message: &str, schema: Option<&str>) -> Result<String, LlmError>;
}

/// Explains query rows in natural language
#[async_trait]
pub trait ResponseSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        message: &str,
        rows: &[Row],
        query: Option<&str>,
    ) -> Result<String, LlmError>;
}

/// Prompt-driven agent over any language model
pub struct LlmAgent {
    model: Arc<dyn LanguageModel>,
}

impl LlmAgent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }
}

#[async_trait]
impl Planner for LlmAgent {
    async fn plan(
        &self,
        message: &str,
        tool_catalogue: &str,
        schema: Option<&str>,
        history: &[ConversationTurn],
    ) -> Result<PlanResult, LlmError> {
        let prompt = build_planning_prompt(message, tool_catalogue, schema, history);
        let response = self.model.generate(&prompt).await?;
        let plan = parse_planning_response(&response.content);
        debug!(tools = ?plan.tools, "Parsed planning decision");
        Ok(plan)
    }
}

#[async_trait]
impl QueryGenerator for LlmAgent {
    async fn generate_query(
        &self,
        message: &str,
        schema: Option<&str>,
    ) -> Result<String, LlmError> {
        let prompt = build_cypher_prompt(message, schema);
        let response = self.model.generate(&prompt).await?;
        Ok(extract_cypher_query(&response.content))
    }
}

#[async_trait]
impl ResponseSynthesizer for LlmAgent {
    async fn synthesize(
        &self,
        message: &str,
        rows: &[Row],
        query: Option<&str>,
    ) -> Result<String, LlmError> {
        let prompt = build_response_prompt(message, rows, query);
        let response = self.model.generate(&prompt).await?;
        Ok(response.content.trim().to_string())
    }
}
