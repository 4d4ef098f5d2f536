//! Embedding models for text vectorization
//!
//! # Models
//!
//! - **OllamaEmbedder**: calls a local Ollama daemon's `/api/embeddings`
//! - **MockEmbeddingModel**: deterministic bag-of-words vectors for tests
//!
//! # Examples
//!
//! ```rust
//! use cropwise_store::embedding::{cosine_similarity, EmbeddingModel, MockEmbeddingModel};
//!
//! let model = MockEmbeddingModel::new(64);
//! let a = model.embed("rice paddy water").unwrap();
//! let b = model.embed("rice").unwrap();
//! assert!(cosine_similarity(&a, &b) > 0.0);
//!
//! // Same text always produces same embedding
//! assert_eq!(a, model.embed("rice paddy water").unwrap());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434";

/// Default Ollama embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Timeout for one embedding request (seconds)
pub const EMBEDDING_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur during embedding generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding service could not be reached
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The embedding service answered with something unusable
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Text to vector conversion
pub trait EmbeddingModel {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Model identifier
    fn model_name(&self) -> &str;
}

/// Deterministic embedding model for tests
///
/// Each lowercased whitespace token is hashed into one of `dimension`
/// buckets and the counts are normalized, so texts sharing words have a
/// positive cosine similarity. Clones share the call counter.
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    dimension: usize,
    failing: bool,
    calls: Arc<AtomicUsize>,
}

impl MockEmbeddingModel {
    /// Create a mock model producing `dimension`-sized vectors
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            failing: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A model whose every call fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new(8)
        }
    }

    /// Number of embed calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() % self.dimension as u64) as usize
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(EmbeddingError::Request("mock embedding failure".to_string()));
        }
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        for token in text.to_lowercase().split_whitespace() {
            embedding[self.bucket(token)] += 1.0;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }
        Ok(embedding)
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
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

/// Embeddings from a local Ollama daemon
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OllamaEmbedder {
    /// Create an embedder for `model` at `endpoint`
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(EMBEDDING_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        }
    }
}

impl Default for OllamaEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_ENDPOINT, DEFAULT_EMBEDDING_MODEL)
    }
}

impl EmbeddingModel for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&OllamaEmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError::Request(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body: OllamaEmbeddingResponse = response
            .json()
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
        if body.embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse("empty embedding".to_string()));
        }
        Ok(body.embedding)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Cosine similarity between two vectors
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_embedding_deterministic() {
        let model = MockEmbeddingModel::new(128);
        let text = "maize needs nitrogen at planting";
        assert_eq!(model.embed(text).unwrap(), model.embed(text).unwrap());
        assert_eq!(model.call_count(), 2);
    }

    #[test]
    fn test_mock_embedding_normalized() {
        let model = MockEmbeddingModel::new(64);
        let embedding = model.embed("test text").unwrap();
        assert_eq!(embedding.len(), 64);
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_mock_embedding_empty_text() {
        let model = MockEmbeddingModel::new(16);
        let result = model.embed("   ");
        assert!(result.unwrap_err().to_string().contains("Empty text"));
    }

    #[test]
    fn test_failing_mock_counts_calls() {
        let model = MockEmbeddingModel::failing();
        assert!(model.embed("rice").is_err());
        assert_eq!(model.clone().call_count(), 1);
    }

    #[test]
    fn test_cosine_similarity_cases() {
        let x = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&x, &x) - 1.0).abs() < 0.0001);
        assert!(cosine_similarity(&x, &[0.0, 1.0, 0.0]).abs() < 0.0001);
        assert!((cosine_similarity(&x, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.0001);
        assert_eq!(cosine_similarity(&x, &[0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&x, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_ollama_embedder_unreachable() {
        // nothing listens on the discard port
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9/", "nomic-embed-text");
        assert_eq!(embedder.model_name(), "nomic-embed-text");
        assert!(matches!(
            embedder.embed("rice"),
            Err(EmbeddingError::Request(_))
        ));
    }
}
