//! Fakes shared by the unit tests in this crate

use async_trait::async_trait;
use cortex_core::Row;
use cortex_graph::{GraphError, GraphSession};
use cortex_llm::{LanguageModel, LlmError, LlmResponse};
use std::sync::{Arc, Mutex};

use crate::context::ToolContext;

#[derive(Default)]
pub(crate) struct FakeSession {
    pub rows: Vec<Row>,
    pub error: Option<GraphError>,
    pub queries: Mutex<Vec<String>>,
}

#[async_trait]
impl GraphSession for FakeSession {
    async fn run(&self, query: &str) -> Result<Vec<Row>, GraphError> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.rows.clone()),
        }
    }
}

pub(crate) struct FakeModel {
    pub reply: Result<String, LlmError>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map(LlmResponse::text)
    }

    fn endpoint(&self) -> &str {
        "http://fake-llm"
    }
}

pub(crate) fn context_with(
    request_id: &str,
    session: Arc<FakeSession>,
    model: Arc<FakeModel>,
) -> ToolContext {
    ToolContext::new(request_id, session, model)
}

pub(crate) fn test_context(request_id: &str) -> ToolContext {
    context_with(
        request_id,
        Arc::new(FakeSession::default()),
        Arc::new(FakeModel::replying("")),
    )
}
