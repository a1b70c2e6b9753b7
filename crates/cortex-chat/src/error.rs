//! Pipeline failures and their user-facing text

use cortex_graph::GraphError;
use cortex_llm::LlmError;
use cortex_tools::ToolError;
use thiserror::Error;

/// Substrings that mark a failure to reach the language model server
const CONNECTIVITY_SIGNATURES: &[&str] = &[
    "Ollama",
    "fetch",
    "Failed to connect",
    "error sending request",
    "Connection refused",
];

pub const NOT_CONNECTED_MESSAGE: &str = "Error: Neo4j database is not connected. Please ensure Neo4j is running and the connection settings in .env are correct.";

const SYNTAX_ERROR_MESSAGE: &str = "I generated an invalid Cypher query. This might be because:\n\n\
- The query syntax was incorrect\n\
- The graph structure doesn't match what I expected\n\
- I misunderstood your question\n\n\
Please try rephrasing your question or be more specific about what you're looking for.";

/// Anything that stops a request before a response is synthesized
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// No session could be acquired
    #[error("{0}")]
    Unavailable(GraphError),

    #[error("Generated query is empty")]
    EmptyQuery,

    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("Tool \"{0}\" is not registered")]
    ToolNotFound(String),

    /// A tool step ended in `ERROR`
    #[error("{0}")]
    Tool(#[from] ToolError),
}

impl PipelineError {
    /// The store error behind this failure, if there is one
    pub fn graph_error(&self) -> Option<&GraphError> {
        match self {
            PipelineError::Unavailable(e) | PipelineError::Tool(ToolError::Graph(e)) => Some(e),
            _ => None,
        }
    }

    /// Text returned to the user in place of an answer
    pub fn user_message(&self, llm_endpoint: &str) -> String {
        if let Some(graph) = self.graph_error() {
            match graph {
                GraphError::Unavailable(_) => return NOT_CONNECTED_MESSAGE.to_string(),
                e if e.is_syntax_error() => return SYNTAX_ERROR_MESSAGE.to_string(),
                GraphError::Client { code, message } if graph.is_client_error() => {
                    let detail = if message.is_empty() { code } else { message };
                    return format!(
                        "Database error: {}\n\nThis might indicate an issue with the query or database connection.",
                        detail
                    );
                }
                _ => {}
            }
        } else {
            let text = self.to_string();
            if CONNECTIVITY_SIGNATURES.iter().any(|sig| text.contains(sig)) {
                return format!(
                    "Unable to connect to the AI service. Please ensure Ollama is running at {}",
                    llm_endpoint
                );
            }
        }

        format!(
            "I encountered an error processing your request: {}\n\nPlease try rephrasing your question or check the server logs for more details.",
            self
        )
    }
}
