//! In-memory entity collection

use cropwise_domain::{EmbeddingCacheEntry, EntityCollection, EntityDocument};
use std::convert::Infallible;

/// An [`EntityCollection`] held in memory
///
/// Documents keep insertion order; embeddings are replaced by key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCollection {
    documents: Vec<EntityDocument>,
    embeddings: Vec<EmbeddingCacheEntry>,
    embedding_upserts: usize,
}

impl InMemoryCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection holding `documents`
    pub fn with_documents(documents: Vec<EntityDocument>) -> Self {
        Self {
            documents,
            ..Self::default()
        }
    }

    /// Add a document
    pub fn insert(&mut self, document: EntityDocument) {
        self.documents.push(document);
    }

    /// Seed the embedding cache
    pub fn with_embeddings(mut self, embeddings: Vec<EmbeddingCacheEntry>) -> Self {
        self.embeddings = embeddings;
        self
    }

    /// Number of embedding writes so far
    pub fn embedding_upserts(&self) -> usize {
        self.embedding_upserts
    }

    /// Cached embedding for `key`
    pub fn cached_embedding(&self, key: &str) -> Option<&EmbeddingCacheEntry> {
        self.embeddings.iter().find(|e| e.key == key)
    }
}

impl EntityCollection for InMemoryCollection {
    type Error = Infallible;

    fn find_parents(&self) -> Result<Vec<EntityDocument>, Self::Error> {
        Ok(self
            .documents
            .iter()
            .filter(|d| !d.is_variant())
            .cloned()
            .collect())
    }

    fn find_variants(&self) -> Result<Vec<EntityDocument>, Self::Error> {
        Ok(self
            .documents
            .iter()
            .filter(|d| d.is_variant())
            .cloned()
            .collect())
    }

    fn load_embeddings(&self) -> Result<Vec<EmbeddingCacheEntry>, Self::Error> {
        Ok(self.embeddings.clone())
    }

    fn upsert_embedding(&mut self, entry: &EmbeddingCacheEntry) -> Result<(), Self::Error> {
        self.embedding_upserts += 1;
        match self.embeddings.iter_mut().find(|e| e.key == entry.key) {
            Some(existing) => *existing = entry.clone(),
            None => self.embeddings.push(entry.clone()),
        }
        Ok(())
    }
}
