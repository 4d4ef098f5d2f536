//! Document chunks submitted for extraction

use serde::{Deserialize, Serialize};

/// Approximate number of characters per model token
pub const CHARS_PER_TOKEN: usize = 4;

/// A bounded slice of a document
///
/// Chunks are created by segmentation with contiguous 0-based ids and are
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in the document (0-based, contiguous)
    #[serde(rename = "chunk_id")]
    pub id: usize,

    /// Chunk text
    pub text: String,

    /// Approximate token count (characters / 4)
    #[serde(rename = "token_count")]
    pub token_estimate: usize,
}

impl Chunk {
    /// Create a chunk, estimating its token count from the text length
    ///
    /// # Examples
    ///
    /// ```
    /// use cropwise_domain::Chunk;
    ///
    /// let chunk = Chunk::new(0, "Rice grows in paddies.");
    /// assert_eq!(chunk.token_estimate, 5);
    /// ```
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        let token_estimate = estimate_tokens(&text);
        Self {
            id,
            text,
            token_estimate,
        }
    }
}

/// Estimate the token count of a text with the 4-characters-per-token heuristic
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}
