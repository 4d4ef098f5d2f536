//! Document-level extraction pipeline
//!
//! ```text
//! raw text → clean → segment → Orchestrator → ChunkAggregator → EntityRecords
//! ```

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::orchestrator::{Orchestrator, OrchestratorStatus};
use crate::segmenter::{clean_text, TextSegmenter};
use crate::types::{ChunkExtractionResult, DocumentExtraction};
use cropwise_domain::{Chunk, ExtractionRunId};
use tracing::{debug, info};

/// Turns documents into merged entity records
pub struct Extractor {
    orchestrator: Orchestrator,
    segmenter: TextSegmenter,
    config: ExtractorConfig,
}

impl Extractor {
    /// Create an extractor; the configuration is validated first
    pub fn new(orchestrator: Orchestrator, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            segmenter: TextSegmenter::new(config.max_chunk_tokens),
            orchestrator: orchestrator
                .with_strategy(config.strategy)
                .with_removal_scope(config.removal_scope)
                .with_max_output_tokens(config.max_output_tokens),
            config,
        })
    }

    /// The configuration in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// The provider pool
    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    /// Snapshot of the provider pool
    pub fn status(&self) -> OrchestratorStatus {
        self.orchestrator.status()
    }

    /// Clean and segment a document without calling any provider
    pub fn segment(&self, text: &str) -> Vec<Chunk> {
        self.segmenter.segment(&clean_text(text))
    }

    /// Extract entities from one document
    ///
    /// Returns `Err` only for input problems (too long, empty after cleaning).
    /// Provider failures are reported on the contained result.
    pub fn extract_document(
        &mut self,
        source_id: &str,
        text: &str,
    ) -> Result<DocumentExtraction, ExtractorError> {
        let length = text.chars().count();
        if length > self.config.max_text_length {
            return Err(ExtractorError::TextTooLong(length, self.config.max_text_length));
        }

        let run = ExtractionRunId::new();
        info!(
            "Starting extraction run {} for '{}', text length {}",
            run, source_id, length
        );

        let chunks = self.segment(text);
        if chunks.is_empty() {
            return Err(ExtractorError::EmptyDocument);
        }
        debug!("'{}' segmented into {} chunks", source_id, chunks.len());

        let mut result = self.extract_chunks(&chunks);
        if let Some(data) = result.data.as_mut() {
            data.stamp_provenance(source_id, run);
        }

        info!(
            "Run {} finished: success={}, provider={}, chunks {}/{}, entities {}",
            run,
            result.success,
            result.provider,
            result.total_chunks_processed,
            chunks.len(),
            result.data.as_ref().map(|d| d.total_entities).unwrap_or(0)
        );

        Ok(DocumentExtraction {
            source_id: source_id.to_string(),
            run_id: run.to_string(),
            total_chunks: chunks.len(),
            result,
        })
    }

    /// Extract pre-segmented chunks with the configured retries and combining
    pub fn extract_chunks(&mut self, chunks: &[Chunk]) -> ChunkExtractionResult {
        self.orchestrator.extract_from_chunks(
            chunks,
            self.config.combine_results,
            self.config.max_retries,
        )
    }
}
