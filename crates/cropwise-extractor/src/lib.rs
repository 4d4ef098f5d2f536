//! Cropwise Extractor
//!
//! Turns agricultural documents into crop-centric entity records using one or
//! more LLM backends.
//!
//! # Architecture
//!
//! ```text
//! Text → clean_text → TextSegmenter → Orchestrator → ProviderAdapter → LLM
//!                                                          ↓
//!                                   parse_structured (repair chain)
//!                                                          ↓
//!                                   ChunkAggregator → EntityRecords
//! ```
//!
//! # Key Features
//!
//! - **Token-bounded segmentation**: paragraphs, then sentences, then words
//! - **Multi-provider failover**: Claude, Gemini and Ollama behind one trait
//! - **JSON repair**: fences, truncation and missing commas are recovered
//! - **Field-wise merging**: the same crop seen in many chunks becomes one record
//!
//! # Example Usage
//!
//! ```
//! use cropwise_extractor::{ExtractionAdapter, Extractor, ExtractorConfig, Orchestrator, ProviderStrategy};
//! use cropwise_llm::MockProvider;
//!
//! let provider = MockProvider::new(r#"{"crops": [{"name": "Rice", "category": "cereal"}]}"#);
//! let orchestrator = Orchestrator::new(
//!     vec![Box::new(ExtractionAdapter::new(provider))],
//!     ProviderStrategy::Failover,
//! );
//! let mut extractor = Extractor::new(orchestrator, ExtractorConfig::default()).unwrap();
//!
//! let extraction = extractor
//!     .extract_document("guide.txt", "Rice is grown in flooded paddies.")
//!     .unwrap();
//! assert!(extraction.result.success);
//! assert_eq!(extraction.entities()[0].name, "Rice");
//! ```

#![warn(missing_docs)]

mod adapter;
mod aggregator;
mod config;
mod error;
mod extractor;
mod orchestrator;
mod parser;
mod prompt;
mod registry;
mod segmenter;
mod types;

#[cfg(test)]
mod tests;

pub use adapter::{
    ExtractionAdapter, ProviderAdapter, DEFAULT_MAX_OUTPUT_TOKENS, EXTRACTION_TEMPERATURE,
};
pub use aggregator::ChunkAggregator;
pub use config::{BackendSettings, ExtractorConfig, ProviderSettings, ProviderStrategy, RemovalScope};
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use orchestrator::{Orchestrator, OrchestratorStatus, ProviderStatus, NO_PROVIDERS};
pub use parser::{parse_structured, repair_json, ParseError, StructuredData};
pub use prompt::extraction_prompt;
pub use registry::{AdapterFactory, ProviderKind, ProviderRegistry};
pub use segmenter::{clean_text, TextSegmenter};
pub use types::{
    AggregatedExtraction, ChunkExtractionResult, ChunkFragment, Completion, DocumentExtraction,
    ExtractionResult, GeneralFindings,
};
