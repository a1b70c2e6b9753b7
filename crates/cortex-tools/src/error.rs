//! Error types for tools and the registry

use cortex_graph::GraphError;
use cortex_llm::LlmError;
use thiserror::Error;

/// Why a tool invocation failed
#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("{0}")]
    Graph(#[from] GraphError),

    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("Tool panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        ToolError::InvalidParameter(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        ToolError::Failed(msg.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool \"{0}\" is already registered")]
    AlreadyRegistered(String),
}
