//! Error types for language model calls

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Any failure talking to the model server, including bad responses
    #[error("Failed to connect to Ollama at {endpoint}: {message}. Make sure Ollama is running.")]
    Connection { endpoint: String, message: String },

    #[error("LLM provider \"{0}\" not yet implemented")]
    UnsupportedProvider(String),
}

impl LlmError {
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        LlmError::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}
