//! Error types for the Extractor

use cropwise_domain::{Classify, ErrorKind};
use thiserror::Error;

/// Errors that stop a document before any provider is called
///
/// Provider failures are not errors here: they are reported as data on
/// [`ChunkExtractionResult`](crate::ChunkExtractionResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractorError {
    /// Text exceeds maximum length
    #[error("Text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),

    /// Nothing left to extract after cleaning
    #[error("Document is empty after cleaning")]
    EmptyDocument,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Classify for ExtractorError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExtractorError::Config(_) => ErrorKind::Configuration,
            ExtractorError::TextTooLong(..) | ExtractorError::EmptyDocument => ErrorKind::Other,
        }
    }
}
