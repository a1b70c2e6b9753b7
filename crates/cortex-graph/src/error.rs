//! Error types for graph store access

use thiserror::Error;

/// Code prefix shared by every Neo4j client-side error
pub const CLIENT_ERROR_PREFIX: &str = "Neo.ClientError";

/// Code Neo4j reports for an unparseable statement
pub const SYNTAX_ERROR_CODE: &str = "Neo.ClientError.Statement.SyntaxError";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// No session could be obtained (store down, pool exhausted)
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the statement
    #[error("{message}")]
    Client { code: String, message: String },

    #[error("Graph transport error: {0}")]
    Transport(String),

    #[error("Unexpected graph store response: {0}")]
    Protocol(String),
}

impl GraphError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        GraphError::Unavailable(msg.into())
    }

    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        GraphError::Client {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        GraphError::Transport(msg.into())
    }

    /// Status code reported by the store, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            GraphError::Client { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_syntax_error(&self) -> bool {
        self.code() == Some(SYNTAX_ERROR_CODE)
    }

    pub fn is_client_error(&self) -> bool {
        self.code()
            .map(|code| code.starts_with(CLIENT_ERROR_PREFIX))
            .unwrap_or(false)
    }
}
