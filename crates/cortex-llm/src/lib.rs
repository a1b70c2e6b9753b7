//! cortex-llm: language model integration
//!
//! ## Supported Providers
//!
//! | Provider | Base URL | Auth Method |
//! |----------|----------|-------------|
//! | Ollama (local) | `http://localhost:11434` | none |
//!
//! ## Environment Variables
//!
//! ```bash
//! LLM_PROVIDER=local
//! LLM_ENDPOINT=http://localhost:11434
//! LLM_MODEL=llama3.1:8b
//! ```
//!
//! [`LlmAgent`] turns any [`LanguageModel`] into the planner, query
//! generator and response synthesizer the chat pipeline consumes.

pub mod agent;
pub mod error;
pub mod ollama;
pub mod parsing;
pub mod prompts;
pub mod provider;

pub use agent::{LlmAgent, Planner, QueryGenerator, ResponseSynthesizer};
pub use error::LlmError;
pub use ollama::OllamaClient;
pub use provider::{create_language_model, LanguageModel, LlmResponse, TokenUsage};
