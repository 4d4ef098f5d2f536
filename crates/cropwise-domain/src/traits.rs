//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::document::{EmbeddingCacheEntry, EntityDocument};
use crate::failure::Classify;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Token accounting for one or more model calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub output_tokens: u64,
    /// True when at least one count was estimated rather than reported
    #[serde(default)]
    pub estimated: bool,
}

impl Usage {
    /// Tokens per whitespace-delimited word, for backends that report nothing
    pub const TOKENS_PER_WORD: f64 = 1.3;

    /// Reported usage
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            estimated: false,
        }
    }

    /// Estimate usage from prompt and completion text
    ///
    /// # Examples
    ///
    /// ```
    /// use cropwise_domain::Usage;
    ///
    /// let usage = Usage::estimate("one two three four five six seven eight nine ten", "ok");
    /// assert_eq!(usage.input_tokens, 13);
    /// assert_eq!(usage.output_tokens, 1);
    /// assert!(usage.estimated);
    /// ```
    pub fn estimate(prompt: &str, completion: &str) -> Self {
        let words = |s: &str| (s.split_whitespace().count() as f64 * Self::TOKENS_PER_WORD) as u64;
        Self {
            input_tokens: words(prompt),
            output_tokens: words(completion),
            estimated: true,
        }
    }

    /// Accumulate another usage record
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.estimated |= other.estimated;
    }

    /// Input plus output tokens
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Parameters for one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Full prompt text
    pub prompt: String,
    /// Maximum completion tokens
    pub max_tokens: u32,
    /// Sampling temperature, backend default when `None`
    pub temperature: Option<f32>,
    /// Ask the backend for JSON output where it supports a JSON mode
    pub json_output: bool,
}

impl GenerationRequest {
    /// A free-form text request
    pub fn text(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
            temperature: None,
            json_output: false,
        }
    }

    /// A request that expects a JSON object back
    pub fn json(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            json_output: true,
            ..Self::text(prompt, max_tokens)
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text produced by a backend, with usage
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Completion text
    pub text: String,
    /// Token usage
    pub usage: Usage,
}

/// A generative-model backend
///
/// Implemented by the infrastructure layer (cropwise-llm)
pub trait LlmProvider {
    /// Error type for generation failures
    type Error: Display + Classify;

    /// Backend name ("claude", "gemini", "ollama", ...)
    fn name(&self) -> &str;

    /// Model identifier
    fn model(&self) -> &str;

    /// Whether the backend can currently be called
    ///
    /// Missing credentials or an unreachable daemon report `false`.
    fn is_available(&self) -> bool;

    /// Context window of the configured model
    fn token_limit(&self) -> usize;

    /// Generate a completion
    fn generate(&self, request: &GenerationRequest) -> Result<Generation, Self::Error>;
}

/// The external document collection entity records are loaded from
///
/// Implemented by the infrastructure layer (cropwise-store)
pub trait EntityCollection {
    /// Error type for collection operations
    type Error: Display;

    /// Documents whose variant marker is absent or false
    fn find_parents(&self) -> Result<Vec<EntityDocument>, Self::Error>;

    /// Documents whose variant marker is true
    fn find_variants(&self) -> Result<Vec<EntityDocument>, Self::Error>;

    /// Every cached embedding
    fn load_embeddings(&self) -> Result<Vec<EmbeddingCacheEntry>, Self::Error>;

    /// Insert or replace the cached embedding for `entry.key`
    fn upsert_embedding(&mut self, entry: &EmbeddingCacheEntry) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates_and_tracks_estimates() {
        let mut total = Usage::new(100, 20);
        total.add(&Usage::new(10, 5));
        assert!(!total.estimated);
        total.add(&Usage::estimate("a b", "c"));
        assert_eq!(total.input_tokens, 112);
        assert_eq!(total.output_tokens, 26);
        assert_eq!(total.total(), 138);
        assert!(total.estimated);
    }

    #[test]
    fn test_json_request_builder() {
        let req = GenerationRequest::json("extract", 4096).with_temperature(0.1);
        assert!(req.json_output);
        assert_eq!(req.max_tokens, 4096);
        assert_eq!(req.temperature, Some(0.1));
    }
}
