//! Uniform extraction capability over any [`LlmProvider`]
//!
//! The orchestrator holds a heterogeneous pool, so the capability is an
//! object-safe trait ([`ProviderAdapter`]) with a single generic
//! implementation ([`ExtractionAdapter`]) wrapping a backend.
//!
//! Adapter methods never return extraction failures as `Err`: unavailable
//! backends, transport errors and unparseable output all come back as
//! `success = false` results carrying a classified [`ErrorKind`].

use crate::aggregator::ChunkAggregator;
use crate::parser::parse_structured;
use crate::prompt::extraction_prompt;
use crate::types::{ChunkExtractionResult, ChunkFragment, Completion, ExtractionResult};
use cropwise_domain::{
    Chunk, Classify, ErrorKind, GenerationRequest, LlmProvider, ProviderFailure, Usage,
};
use tracing::{debug, info, warn};

/// Sampling temperature for extraction calls
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Default completion cap for extraction calls
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;

/// Extraction capability shared by every backend
pub trait ProviderAdapter {
    /// Backend name ("claude", "gemini", "ollama", ...)
    fn provider_name(&self) -> &str;

    /// Model identifier
    fn model(&self) -> &str;

    /// Whether the backend can currently be called
    fn available(&self) -> bool;

    /// Context window of the configured model
    fn token_limit(&self) -> usize;

    /// Extract a structured object from one text
    fn extract_from_text(&self, text: &str, max_tokens: Option<u32>) -> ExtractionResult;

    /// Extract every chunk in id order, combining fragments if asked
    fn extract_from_chunks(
        &self,
        chunks: &[Chunk],
        combine: bool,
        max_tokens: Option<u32>,
    ) -> ChunkExtractionResult;

    /// Free-form generation for answer writing
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, ProviderFailure>;
}

/// [`ProviderAdapter`] over a concrete backend
pub struct ExtractionAdapter<P: LlmProvider> {
    provider: P,
    max_output_tokens: u32,
}

impl<P: LlmProvider> ExtractionAdapter<P> {
    /// Wrap a backend
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    /// Override the completion cap used when callers pass none
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens.max(1);
        self
    }

    /// The wrapped backend
    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn unavailable(&self) -> ProviderFailure {
        ProviderFailure::new(
            ErrorKind::Configuration,
            format!("Provider {} is not available", self.provider.name()),
        )
    }

    /// One extraction call, without the availability probe
    fn run(&self, text: &str, max_tokens: Option<u32>) -> ExtractionResult {
        let name = self.provider.name();
        let model = self.provider.model();
        let request = GenerationRequest::json(
            extraction_prompt(text),
            max_tokens.unwrap_or(self.max_output_tokens),
        )
        .with_temperature(EXTRACTION_TEMPERATURE);

        let generation = match self.provider.generate(&request) {
            Ok(generation) => generation,
            Err(e) => return ExtractionResult::failure(name, model, e.kind(), e.to_string()),
        };

        match parse_structured(&generation.text) {
            Ok(data) => ExtractionResult::success(name, model, data, generation.usage),
            Err(e) => ExtractionResult::failure(name, model, e.kind(), e.to_string())
                .with_raw_response(generation.text)
                .with_usage(generation.usage),
        }
    }
}

impl<P: LlmProvider> ProviderAdapter for ExtractionAdapter<P> {
    fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn model(&self) -> &str {
        self.provider.model()
    }

    fn available(&self) -> bool {
        self.provider.is_available()
    }

    fn token_limit(&self) -> usize {
        self.provider.token_limit()
    }

    fn extract_from_text(&self, text: &str, max_tokens: Option<u32>) -> ExtractionResult {
        if !self.available() {
            let failure = self.unavailable();
            return ExtractionResult::failure(
                self.provider.name(),
                self.provider.model(),
                failure.kind,
                failure.message,
            );
        }
        self.run(text, max_tokens)
    }

    fn extract_from_chunks(
        &self,
        chunks: &[Chunk],
        combine: bool,
        max_tokens: Option<u32>,
    ) -> ChunkExtractionResult {
        let name = self.provider.name();
        if !self.available() {
            let failure = self.unavailable();
            return ChunkExtractionResult::failure(name, failure.kind, failure.message);
        }

        let mut ordered: Vec<&Chunk> = chunks.iter().collect();
        ordered.sort_by_key(|c| c.id);

        let mut fragments = Vec::new();
        let mut total_usage = Usage::default();
        let mut last_error: Option<(ErrorKind, String)> = None;

        for chunk in ordered {
            debug!(
                "{}: extracting chunk {} (~{} tokens)",
                name, chunk.id, chunk.token_estimate
            );
            let result = self.run(&chunk.text, max_tokens);
            if let Some(usage) = &result.usage {
                total_usage.add(usage);
            }

            match result.data {
                Some(data) if result.success => fragments.push(ChunkFragment {
                    chunk_id: chunk.id,
                    data,
                    usage: result.usage,
                }),
                _ => {
                    let message = result.error.unwrap_or_default();
                    warn!("{}: chunk {} failed: {}", name, chunk.id, message);
                    last_error = Some((result.error_kind.unwrap_or(ErrorKind::Other), message));
                }
            }
        }

        if fragments.is_empty() {
            let (kind, message) = match last_error {
                Some((kind, message)) => (
                    kind,
                    format!("Failed to extract data from any chunks: {}", message),
                ),
                None => (
                    ErrorKind::Other,
                    "Failed to extract data from any chunks".to_string(),
                ),
            };
            let mut failure = ChunkExtractionResult::failure(name, kind, message);
            failure.total_usage = total_usage;
            return failure;
        }

        info!(
            "{}: extracted {}/{} chunks ({} tokens)",
            name,
            fragments.len(),
            chunks.len(),
            total_usage.total()
        );

        let total_chunks_processed = fragments.len();
        let (data, chunk_results) = if combine {
            (Some(ChunkAggregator::combine(&fragments)), None)
        } else {
            (None, Some(fragments))
        };

        ChunkExtractionResult {
            success: true,
            data,
            chunk_results,
            total_chunks_processed,
            total_usage,
            provider: name.to_string(),
            error: None,
            error_kind: None,
        }
    }

    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion, ProviderFailure> {
        if !self.available() {
            return Err(self.unavailable());
        }
        let generation = self
            .provider
            .generate(&GenerationRequest::text(prompt, max_tokens))
            .map_err(|e| ProviderFailure::from_error(&e))?;
        Ok(Completion {
            text: generation.text,
            provider: self.provider.name().to_string(),
            model: self.provider.model().to_string(),
            usage: generation.usage,
        })
    }
}
