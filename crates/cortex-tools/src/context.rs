//! Per-request context handed to tools

use cortex_core::{ConversationTurn, ExplicitContext};
use cortex_graph::SharedSession;
use cortex_llm::LanguageModel;
use std::sync::Arc;
use tracing::Span;

/// Read-only bundle a tool executes against.
///
/// Built once per request by the pipeline and borrowed by every tool call
/// in that request.
#[derive(Clone)]
pub struct ToolContext {
    /// Request span; tool logging nests under it
    pub span: Span,
    pub session: SharedSession,
    pub llm: Arc<dyn LanguageModel>,
    pub request_id: String,
    pub explicit_context: Option<ExplicitContext>,
    pub history: Vec<ConversationTurn>,
}

impl ToolContext {
    pub fn new(
        request_id: impl Into<String>,
        session: SharedSession,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            span: Span::current(),
            session,
            llm,
            request_id: request_id.into(),
            explicit_context: None,
            history: Vec::new(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_explicit_context(mut self, context: Option<ExplicitContext>) -> Self {
        self.explicit_context = context.filter(|c| !c.is_empty());
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }
}
