//! Ollama API Client (local)
//!
//! ## API Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|--------|
//! | Local API | `http://localhost:11434` | Local Ollama instance |
//! | Generate | `/api/generate` | Text generation |

use async_trait::async_trait;
use cortex_core::config::LlmConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info};

use crate::error::LlmError;
use crate::provider::{LanguageModel, LlmResponse, TokenUsage};

// =============================================================================
// API ENDPOINT CONFIGURATION
// =============================================================================

/// Ollama API endpoints
pub mod endpoints {
    /// Local API URL (default)
    pub const LOCAL_API: &str = "http://localhost:11434";

    /// Generate endpoint
    /// Full URL: {API}/api/generate
    pub const GENERATE: &str = "/api/generate";
}

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

/// Non-streaming client for a local Ollama server
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let client = Client::builder()
            .build()
            .map_err(|e| LlmError::connection(&endpoint, e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, prompt: &str) -> Result<GenerateResponse, String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}{}", self.endpoint, endpoints::GENERATE))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!(
                "Ollama API error: {}",
                status.canonical_reason().unwrap_or(status.as_str())
            ));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();

        match self.request(prompt).await {
            Ok(data) => {
                let content = data.response.unwrap_or_default();
                info!(
                    model = %self.model,
                    duration_ms = start.elapsed().as_millis() as u64,
                    prompt_length = prompt.len(),
                    response_length = content.len(),
                    "LLM request completed"
                );
                Ok(LlmResponse {
                    content,
                    usage: Some(TokenUsage {
                        prompt_tokens: data.prompt_eval_count,
                        completion_tokens: data.eval_count,
                    }),
                })
            }
            Err(message) => {
                error!(
                    error = %message,
                    model = %self.model,
                    endpoint = %self.endpoint,
                    "LLM request failed"
                );
                Err(LlmError::connection(&self.endpoint, message))
            }
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
