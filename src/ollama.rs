//! Ollama-backed providers for local models.
//!
//! This module is only available when the `ollama` feature is enabled.
//! Talks to a local Ollama server (`/api/embeddings` and `/api/generate`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::LlmProvider;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// An [`EmbeddingProvider`] backed by a local Ollama server.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for the given model and its embedding dimensionality
    /// (e.g. `nomic-embed-text`, 768).
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
            dimensions,
        }
    }

    /// Override the Ollama server URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, text_len = text.len(), "ollama embedding");

        let url = format!("{}/api/embeddings", self.base_url);
        let request = OllamaEmbeddingRequest { model: &self.model, prompt: text };

        let response =
            self.client.post(&url).json(&request).send().await.map_err(|e| {
                error!(error = %e, "ollama embedding request failed");
                RagError::Embedding {
                    provider: "Ollama".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            return Err(RagError::Embedding {
                provider: "Ollama".into(),
                message: format!("server returned {}", response.status()),
            });
        }

        let parsed: OllamaEmbeddingResponse =
            response.json().await.map_err(|e| RagError::Embedding {
                provider: "Ollama".into(),
                message: format!("failed to parse response: {e}"),
            })?;
        Ok(parsed.embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// An [`LlmProvider`] backed by a local Ollama server.
pub struct OllamaChatProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaChatProvider {
    /// Create a provider for the given model (e.g. `llama3`).
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
            model: model.into(),
        }
    }

    /// Override the Ollama server URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[async_trait]
impl LlmProvider for OllamaChatProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "ollama generate");

        let url = format!("{}/api/generate", self.base_url);
        let request =
            OllamaGenerateRequest { model: &self.model, prompt, stream: false };

        let response =
            self.client.post(&url).json(&request).send().await.map_err(|e| {
                error!(error = %e, "ollama generate request failed");
                RagError::ProviderUnavailable {
                    provider: "Ollama".into(),
                    message: format!("request failed: {e}"),
                }
            })?;

        if !response.status().is_success() {
            return Err(RagError::ProviderUnavailable {
                provider: "Ollama".into(),
                message: format!("server returned {}", response.status()),
            });
        }

        let parsed: OllamaGenerateResponse =
            response.json().await.map_err(|e| RagError::ProviderUnavailable {
                provider: "Ollama".into(),
                message: format!("failed to parse response: {e}"),
            })?;
        Ok(parsed.response.trim().to_string())
    }
}
