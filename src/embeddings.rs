//! Embedding capability: a provider trait, a deterministic mock for tests,
//! and an Ollama-backed HTTP provider.
//!
//! The core never trains or selects models; it hands text to a provider and
//! stores whatever vectors come back. Vector dimensionality is fixed per
//! provider and baked into the index schema at creation time.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::Deserialize;

use crate::types::RagError;

/// Produces fixed-width embedding vectors for text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Width of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| RagError::Embedding("provider returned an empty batch".into()))
    }
}

/// Deterministic hash-seeded embeddings for tests and offline runs.
///
/// Identical text always maps to an identical unit vector (cosine distance
/// zero), different text almost surely to a different one. No network, no
/// model weights.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dims: 64 }
    }

    pub fn with_dimensions(dims: usize) -> Self {
        assert!(dims > 0, "embedding width must be positive");
        Self { dims }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector: Vec<f32> = (0..self.dims)
            .map(|lane| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                lane.hash(&mut hasher);
                let raw = hasher.finish();
                ((raw % 2_000) as f32 / 1_000.0) - 1.0
            })
            .collect();
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Embeddings served by a local Ollama instance (`POST /api/embed`).
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dims: usize,
}

impl OllamaEmbeddingProvider {
    /// `dims` must match the named model's output width; the index schema is
    /// created from it.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dims: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            dims,
        }
    }
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/embed", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        if !response.status().is_success() {
            return Err(RagError::Embedding(format!(
                "embedding endpoint returned {}",
                response.status()
            )));
        }
        let body: OllamaEmbedResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;
        if body.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                body.embeddings.len()
            )));
        }
        Ok(body.embeddings)
    }
}
