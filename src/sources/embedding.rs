//! Query embeddings for local retrieval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{endpoint, send_and_decode};
use crate::error::SourceError;

/// Turns text into a dense vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, for logs.
    fn model(&self) -> &str;

    /// Embeds `text`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failures or an empty vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, SourceError>;
}

/// Embedder backed by a local Ollama server (`POST /api/embeddings`).
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Creates an embedder for `model` served at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SourceError> {
        let request = self
            .http
            .post(endpoint(&self.base_url, "api/embeddings"))
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            });

        let response: EmbeddingResponse = send_and_decode(request).await?;

        if response.embedding.is_empty() {
            return Err(SourceError::InvalidResponse {
                message: format!("model {} returned an empty embedding", self.model),
            });
        }

        Ok(response.embedding)
    }
}
