//! Cropwise Storage Layer
//!
//! Loads entity documents from a collection into an in-memory knowledge
//! index and answers retrieval queries against it.
//!
//! # Architecture
//!
//! - [`EntityCollection`](cropwise_domain::EntityCollection) implementations:
//!   SQLite for persistence, in-memory for tests and embedding callers
//! - [`KnowledgeStore`] merges parents, links variants and keeps an
//!   embedding per entity, cached in the collection by text hash
//! - [`RetrievalEngine`] ranks by cosine similarity, falling back to
//!   keyword term counts
//!
//! # Examples
//!
//! ```
//! use cropwise_domain::{EntityDocument, EntityRecord};
//! use cropwise_store::{InMemoryCollection, KnowledgeStore, RetrievalEngine};
//!
//! let collection = InMemoryCollection::with_documents(vec![
//!     EntityDocument::parent("1", EntityRecord::new("Rice")),
//! ]);
//! let mut store = KnowledgeStore::new(collection);
//! store.load().unwrap();
//!
//! let hits = RetrievalEngine::new(&store).search("tell me about rice", 3);
//! assert_eq!(hits[0].entity.record.name, "Rice");
//! ```

#![warn(missing_docs)]

pub mod embedding;

mod collection;
mod knowledge;
mod search;
mod sqlite;

use thiserror::Error;

pub use collection::InMemoryCollection;
pub use embedding::{
    cosine_similarity, EmbeddingError, EmbeddingModel, MockEmbeddingModel, OllamaEmbedder,
};
pub use knowledge::{searchable_text, text_hash, IndexedEntity, KnowledgeStore, LoadStats};
pub use search::{RetrievalEngine, SearchHit, SearchMethod};
pub use sqlite::SqliteCollection;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The entity collection failed
    #[error("Collection error: {0}")]
    Collection(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
