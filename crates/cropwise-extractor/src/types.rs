//! Result types for extraction

use crate::parser::StructuredData;
use cropwise_domain::{EntityRecord, ErrorKind, ExtractionRunId, ProviderFailure, Usage};
use serde::{Deserialize, Serialize};

/// Outcome of one single-text extraction call
///
/// Failures are data: `success` is false and `error`/`error_kind` say why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Whether an object was recovered
    pub success: bool,

    /// The recovered object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<StructuredData>,

    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Provider name
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Token usage, when the backend was reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Model output that could not be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ExtractionResult {
    /// A successful extraction
    pub fn success(
        provider: impl Into<String>,
        model: impl Into<String>,
        data: StructuredData,
        usage: Usage,
    ) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            provider: provider.into(),
            model: model.into(),
            usage: Some(usage),
            raw_response: None,
        }
    }

    /// A failed extraction
    pub fn failure(
        provider: impl Into<String>,
        model: impl Into<String>,
        kind: ErrorKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_kind: Some(kind),
            provider: provider.into(),
            model: model.into(),
            usage: None,
            raw_response: None,
        }
    }

    /// Attach the unparseable model output
    pub fn with_raw_response(mut self, raw: impl Into<String>) -> Self {
        self.raw_response = Some(raw.into());
        self
    }

    /// Attach usage to a failure
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// One successfully extracted chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkFragment {
    /// Id of the source chunk
    pub chunk_id: usize,

    /// Object recovered for the chunk
    pub data: StructuredData,

    /// Usage for the chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Findings not tied to any entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralFindings {
    /// Practices that apply across crops
    pub practices: Vec<String>,

    /// Advice that applies across crops
    pub recommendations: Vec<String>,

    /// Per-chunk source summaries
    pub sources: Vec<String>,
}

/// Entities merged across all fragments of a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedExtraction {
    /// Merged entities in first-seen order
    pub entities: Vec<EntityRecord>,

    /// Findings not tied to any entity
    pub general: GeneralFindings,

    /// Number of entities
    pub total_entities: usize,
}

impl AggregatedExtraction {
    /// Record the source document and run on every entity
    pub fn stamp_provenance(&mut self, source_id: &str, run: ExtractionRunId) {
        for entity in &mut self.entities {
            entity.provenance.add_source(source_id);
            entity.provenance.add_run(run);
        }
    }
}

/// Outcome of a batch extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkExtractionResult {
    /// True when at least one chunk produced an object
    pub success: bool,

    /// Combined entities (when combining)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AggregatedExtraction>,

    /// Individual fragments (when not combining)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_results: Option<Vec<ChunkFragment>>,

    /// Chunks that produced an object
    pub total_chunks_processed: usize,

    /// Usage summed over every call made
    pub total_usage: Usage,

    /// Provider that ran the batch ("none" or "multiple" for pool failures)
    pub provider: String,

    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ChunkExtractionResult {
    /// A failed batch
    pub fn failure(provider: impl Into<String>, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            chunk_results: None,
            total_chunks_processed: 0,
            total_usage: Usage::default(),
            provider: provider.into(),
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    /// The failure as a classified error, if this batch failed
    pub fn failure_info(&self) -> Option<ProviderFailure> {
        if self.success {
            return None;
        }
        Some(ProviderFailure::new(
            self.error_kind.unwrap_or(ErrorKind::Other),
            self.error.clone().unwrap_or_default(),
        ))
    }
}

/// Free-form text produced by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Generated text
    pub text: String,

    /// Provider name
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Token usage
    pub usage: Usage,
}

/// Result of extracting one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExtraction {
    /// Source document identifier
    pub source_id: String,

    /// Run identifier (UUID string)
    pub run_id: String,

    /// Number of chunks the document was cut into
    pub total_chunks: usize,

    /// Batch result
    pub result: ChunkExtractionResult,
}

impl DocumentExtraction {
    /// Merged entities, if the batch succeeded with combining
    pub fn entities(&self) -> &[EntityRecord] {
        self.result
            .data
            .as_ref()
            .map(|d| d.entities.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_wire_shape() {
        let result = ChunkExtractionResult::failure("none", ErrorKind::Configuration, "no providers");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["provider"], "none");
        assert_eq!(json["error_kind"], "configuration");
        assert!(json.get("data").is_none());
        assert_eq!(json["total_usage"]["input_tokens"], 0);

        let info = result.failure_info().unwrap();
        assert_eq!(info.kind, ErrorKind::Configuration);
        assert_eq!(info.message, "no providers");
    }

    #[test]
    fn test_stamp_provenance() {
        let mut aggregated = AggregatedExtraction {
            entities: vec![EntityRecord::new("Rice"), EntityRecord::new("Wheat")],
            ..AggregatedExtraction::default()
        };
        let run = ExtractionRunId::from_value(7);
        aggregated.stamp_provenance("guide.pdf", run);
        aggregated.stamp_provenance("guide.pdf", run);
        for entity in &aggregated.entities {
            assert_eq!(entity.provenance.source_documents, vec!["guide.pdf"]);
            assert_eq!(entity.provenance.extraction_runs, vec![run.to_string()]);
        }
    }
}
