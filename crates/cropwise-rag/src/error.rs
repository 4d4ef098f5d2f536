//! Error types for the AnswerGenerator

use cropwise_store::StoreError;
use thiserror::Error;

/// Errors raised while setting up an AnswerGenerator
///
/// Answering itself never fails; see [`ChatResponse`](crate::ChatResponse).
#[derive(Error, Debug)]
pub enum RagError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The knowledge store could not be loaded
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
