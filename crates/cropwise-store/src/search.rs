//! Hybrid retrieval over a loaded knowledge store
//!
//! Vector similarity is used when the store has embeddings and the query can
//! be embedded. Otherwise, or when no entity scores above zero, retrieval
//! falls back to counting query terms found in each entity's searchable text.

use crate::embedding::cosine_similarity;
use crate::knowledge::{IndexedEntity, KnowledgeStore};
use cropwise_domain::EntityCollection;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// How a hit was scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Cosine similarity of embeddings
    Vector,
    /// Count of distinct query terms present
    Keyword,
}

/// One retrieved entity
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    /// The entity
    pub entity: &'a IndexedEntity,
    /// Similarity or term count, always above zero
    pub score: f32,
    /// Which pass produced the score
    pub method: SearchMethod,
}

/// Ranks entities of a [`KnowledgeStore`] against a query
pub struct RetrievalEngine<'a, C: EntityCollection> {
    store: &'a KnowledgeStore<C>,
}

impl<'a, C: EntityCollection> RetrievalEngine<'a, C> {
    /// Create an engine over `store`
    pub fn new(store: &'a KnowledgeStore<C>) -> Self {
        Self { store }
    }

    /// Top `top_k` entities for `query`, best first
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit<'a>> {
        if top_k == 0 || query.trim().is_empty() {
            return Vec::new();
        }

        if self.store.embeddings_available() {
            if let Some(vector) = self.store.embed_query(query) {
                let hits = self.search_vector(&vector, top_k);
                if !hits.is_empty() {
                    debug!("Vector search returned {} hits", hits.len());
                    return hits;
                }
            }
        }

        let hits = self.search_keyword(query, top_k);
        debug!("Keyword search returned {} hits", hits.len());
        hits
    }

    /// Top `top_k` entities by cosine similarity to `vector`
    pub fn search_vector(&self, vector: &[f32], top_k: usize) -> Vec<SearchHit<'a>> {
        let mut hits: Vec<SearchHit<'a>> = self
            .store
            .entities()
            .iter()
            .filter_map(|entity| {
                let embedding = entity.embedding.as_ref()?;
                let score = cosine_similarity(vector, embedding);
                (score > 0.0).then_some(SearchHit {
                    entity,
                    score,
                    method: SearchMethod::Vector,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        hits
    }

    /// Top `top_k` entities by number of distinct query terms present
    ///
    /// Ties keep index order.
    pub fn search_keyword(&self, query: &str, top_k: usize) -> Vec<SearchHit<'a>> {
        let lowered = query.to_lowercase();
        let mut terms: Vec<&str> = Vec::new();
        for term in lowered.split_whitespace() {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }

        let mut hits: Vec<SearchHit<'a>> = self
            .store
            .entities()
            .iter()
            .filter_map(|entity| {
                let matched = terms
                    .iter()
                    .filter(|term| entity.searchable_text.contains(**term))
                    .count();
                (matched > 0).then_some(SearchHit {
                    entity,
                    score: matched as f32,
                    method: SearchMethod::Keyword,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::InMemoryCollection;
    use crate::embedding::MockEmbeddingModel;
    use cropwise_domain::{EntityDocument, EntityRecord};

    fn record(name: &str, practice: &str) -> EntityRecord {
        let mut record = EntityRecord::new(name);
        record.farming_practices = vec![practice.to_string()];
        record
    }

    fn collection() -> InMemoryCollection {
        InMemoryCollection::with_documents(vec![
            EntityDocument::parent("1", record("Wheat", "Apply nitrogen fertilizer at tillering")),
            EntityDocument::parent("2", record("Rice", "Split fertilizer doses in flooded fields")),
            EntityDocument::parent("3", record("Cassava", "Plant stem cuttings")),
        ])
    }

    #[test]
    fn test_keyword_ranking() {
        let mut store = KnowledgeStore::new(collection());
        store.load().unwrap();
        let engine = RetrievalEngine::new(&store);

        let hits = engine.search("rice fertilizer", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entity.record.name, "Rice");
        assert_eq!(hits[0].score, 2.0);
        assert_eq!(hits[0].method, SearchMethod::Keyword);
        assert_eq!(hits[1].entity.record.name, "Wheat");
        assert_eq!(hits[1].score, 1.0);
    }

    #[test]
    fn test_keyword_ties_keep_index_order() {
        let mut store = KnowledgeStore::new(collection());
        store.load().unwrap();
        let hits = RetrievalEngine::new(&store).search("fertilizer FERTILIZER", 5);
        let names: Vec<&str> = hits.iter().map(|h| h.entity.record.name.as_str()).collect();
        assert_eq!(names, vec!["Wheat", "Rice"]);
        assert!(hits.iter().all(|h| h.score == 1.0));
    }

    #[test]
    fn test_zero_top_k_and_blank_query() {
        let mut store = KnowledgeStore::new(collection());
        store.load().unwrap();
        let engine = RetrievalEngine::new(&store);
        assert!(engine.search("rice", 0).is_empty());
        assert!(engine.search("   ", 3).is_empty());
        assert!(engine.search("banana", 3).is_empty());
    }

    #[test]
    fn test_vector_search_identical_text_ranks_first() {
        let model = MockEmbeddingModel::new(256);
        let mut store = KnowledgeStore::new(collection()).with_embedder(Box::new(model.clone()));
        store.load().unwrap();
        let engine = RetrievalEngine::new(&store);

        let text = store.get("cassava").unwrap().searchable_text.clone();
        let hits = engine.search(&text, 2);
        assert_eq!(hits[0].entity.record.name, "Cassava");
        assert_eq!(hits[0].method, SearchMethod::Vector);
        assert!((hits[0].score - 1.0).abs() < 1e-5);
        assert!(hits.len() <= 2);
    }

    #[test]
    fn test_vector_search_falls_back_without_overlap() {
        let mut store = KnowledgeStore::new(collection())
            .with_embedder(Box::new(MockEmbeddingModel::new(4096)));
        store.load().unwrap();
        let engine = RetrievalEngine::new(&store);

        // a zero vector scores zero everywhere
        let zero = vec![0.0; 4096];
        assert!(engine.search_vector(&zero, 3).is_empty());
        let hits = engine.search_keyword("cuttings", 3);
        assert_eq!(hits[0].entity.record.name, "Cassava");
    }
}
