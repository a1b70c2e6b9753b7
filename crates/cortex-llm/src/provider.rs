//! Language model trait and factory

use async_trait::async_trait;
use cortex_core::config::{LlmConfig, LlmProviderKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::LlmError;
use crate::ollama::OllamaClient;

/// Token accounting reported by the model server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// Completion returned by [`LanguageModel::generate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl LlmResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }
}

/// Text in, text out
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError>;

    /// Server the model is reached at; used in user-facing connectivity errors
    fn endpoint(&self) -> &str;
}

/// Build the configured model client
pub fn create_language_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    match config.provider {
        LlmProviderKind::Local => Ok(Arc::new(OllamaClient::new(config)?)),
        LlmProviderKind::Cloud => Err(LlmError::UnsupportedProvider("cloud".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: LlmProviderKind) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: None,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    #[test]
    fn test_local_provider_builds_ollama_client() {
        let model = create_language_model(&config(LlmProviderKind::Local)).unwrap();
        assert_eq!(model.endpoint(), "http://localhost:11434");
    }

    #[test]
    fn test_cloud_provider_is_not_implemented() {
        let err = create_language_model(&config(LlmProviderKind::Cloud)).err().unwrap();
        assert_eq!(err.to_string(), "LLM provider \"cloud\" not yet implemented");
    }
}
