//! In-memory knowledge index over an entity collection
//!
//! The store reads parent and variant documents once, merges parents that
//! share a normalized key, links variants under their parents and builds the
//! lowercase searchable text used by keyword retrieval. When an embedding
//! model is configured, each entity also gets a vector, reused from the
//! collection's embedding cache whenever the text hash is unchanged.

use crate::embedding::EmbeddingModel;
use crate::StoreError;
use cropwise_domain::{EmbeddingCacheEntry, EntityCollection, EntityRecord, Merge};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One entity as indexed for retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedEntity {
    /// Normalized key
    pub key: String,

    /// Merged record
    pub record: EntityRecord,

    /// Variant records linked under this entity
    pub variants: Vec<EntityRecord>,

    /// Lowercased text matched by keyword search
    pub searchable_text: String,

    /// SHA-256 hex of `searchable_text`
    pub text_hash: String,

    /// Embedding of `searchable_text`, if one could be computed
    pub embedding: Option<Vec<f32>>,
}

impl IndexedEntity {
    fn new(key: String, record: EntityRecord) -> Self {
        Self {
            key,
            record,
            variants: Vec::new(),
            searchable_text: String::new(),
            text_hash: String::new(),
            embedding: None,
        }
    }

    fn add_variant(&mut self, variant: EntityRecord) {
        let key = variant.key();
        match self.variants.iter_mut().find(|v| v.key() == key) {
            Some(existing) => existing.merge_from(&variant),
            None => self.variants.push(variant),
        }
    }

    fn refresh_text(&mut self) {
        self.searchable_text = searchable_text(&self.record, &self.variants);
        self.text_hash = text_hash(&self.searchable_text);
    }
}

/// Counters from one load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Entities indexed
    pub entities: usize,
    /// Variants linked under a parent
    pub linked_variants: usize,
    /// Variants without a known parent, indexed on their own
    pub orphan_variants: usize,
    /// Vectors reused from the cache
    pub cache_hits: usize,
    /// Vectors computed fresh
    pub embedded: usize,
    /// Entities left without a vector
    pub embedding_failures: usize,
}

/// Entity index with an embedding cache
pub struct KnowledgeStore<C: EntityCollection> {
    collection: C,
    embedder: Option<Box<dyn EmbeddingModel>>,
    entities: Vec<IndexedEntity>,
    positions: HashMap<String, usize>,
    loaded: bool,
}

impl<C: EntityCollection> KnowledgeStore<C> {
    /// Create a store reading from `collection`, keyword search only
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            embedder: None,
            entities: Vec::new(),
            positions: HashMap::new(),
            loaded: false,
        }
    }

    /// Enable vector search with `embedder`
    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingModel>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// The underlying collection
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Whether [`load`](Self::load) has run
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Read the collection and build the index
    ///
    /// Only the first call does any work; later calls return default stats.
    pub fn load(&mut self) -> Result<LoadStats, StoreError> {
        if self.loaded {
            debug!("Knowledge store already loaded");
            return Ok(LoadStats::default());
        }

        let parents = self
            .collection
            .find_parents()
            .map_err(|e| StoreError::Collection(e.to_string()))?;
        let variants = self
            .collection
            .find_variants()
            .map_err(|e| StoreError::Collection(e.to_string()))?;

        let mut stats = LoadStats::default();
        let mut parent_keys: HashMap<String, String> = HashMap::new();

        for document in parents {
            let key = document.record.key();
            if key.is_empty() {
                warn!("Skipping parent document '{}' without a name", document.id);
                continue;
            }
            self.upsert(document.record);
            if !document.id.is_empty() {
                parent_keys.insert(document.id, key);
            }
        }

        for document in variants {
            let parent = document
                .parent_id
                .as_ref()
                .and_then(|id| parent_keys.get(id))
                .and_then(|key| self.positions.get(key).copied());
            match parent {
                Some(pos) => {
                    self.entities[pos].add_variant(document.record);
                    stats.linked_variants += 1;
                }
                None => {
                    debug!(
                        "Variant '{}' has no known parent; indexing it standalone",
                        document.record.name
                    );
                    let is_new = !self.positions.contains_key(&document.record.key());
                    if self.upsert(document.record).is_some() && is_new {
                        stats.orphan_variants += 1;
                    }
                }
            }
        }

        for entity in &mut self.entities {
            entity.refresh_text();
        }

        let all: Vec<usize> = (0..self.entities.len()).collect();
        self.embed_entities(&all, &mut stats);

        self.loaded = true;
        stats.entities = self.entities.len();
        info!(
            "Loaded {} entities ({} variants linked, {} orphan variants); embeddings: {} cached, {} computed, {} failed",
            stats.entities,
            stats.linked_variants,
            stats.orphan_variants,
            stats.cache_hits,
            stats.embedded,
            stats.embedding_failures
        );
        Ok(stats)
    }

    /// Fold freshly extracted records into the index
    ///
    /// Touched entities get their text, hash and embedding refreshed.
    /// Returns the number of distinct entities touched.
    pub fn merge_records(&mut self, records: Vec<EntityRecord>) -> usize {
        let mut touched: Vec<usize> = Vec::new();
        for record in records {
            if let Some(pos) = self.upsert(record) {
                if !touched.contains(&pos) {
                    touched.push(pos);
                }
            }
        }
        for pos in &touched {
            self.entities[*pos].refresh_text();
        }
        let mut stats = LoadStats::default();
        self.embed_entities(&touched, &mut stats);
        debug!(
            "Merged records into {} entities ({} embedded)",
            touched.len(),
            stats.embedded
        );
        touched.len()
    }

    fn upsert(&mut self, record: EntityRecord) -> Option<usize> {
        let key = record.key();
        if key.is_empty() {
            return None;
        }
        match self.positions.get(&key) {
            Some(&pos) => {
                self.entities[pos].record.merge_from(&record);
                Some(pos)
            }
            None => {
                let pos = self.entities.len();
                self.entities.push(IndexedEntity::new(key.clone(), record));
                self.positions.insert(key, pos);
                Some(pos)
            }
        }
    }

    fn embed_entities(&mut self, positions: &[usize], stats: &mut LoadStats) {
        let Some(embedder) = self.embedder.as_ref() else {
            return;
        };

        let cache: HashMap<String, EmbeddingCacheEntry> = match self.collection.load_embeddings() {
            Ok(entries) => entries.into_iter().map(|e| (e.key.clone(), e)).collect(),
            Err(e) => {
                warn!("Could not read embedding cache: {}", e);
                HashMap::new()
            }
        };

        let model = embedder.model_name();
        for &pos in positions {
            let entity = &mut self.entities[pos];
            if let Some(cached) = cache.get(&entity.key) {
                if cached.model == model
                    && cached.text_hash == entity.text_hash
                    && !cached.vector.is_empty()
                {
                    entity.embedding = Some(cached.vector.clone());
                    stats.cache_hits += 1;
                    continue;
                }
            }

            match embedder.embed(&entity.searchable_text) {
                Ok(vector) => {
                    let entry = EmbeddingCacheEntry {
                        key: entity.key.clone(),
                        text_hash: entity.text_hash.clone(),
                        model: model.to_string(),
                        vector: vector.clone(),
                    };
                    entity.embedding = Some(vector);
                    stats.embedded += 1;
                    if let Err(e) = self.collection.upsert_embedding(&entry) {
                        warn!("Could not cache embedding for '{}': {}", entry.key, e);
                    }
                }
                Err(e) => {
                    warn!("Embedding failed for '{}': {}", entity.key, e);
                    entity.embedding = None;
                    stats.embedding_failures += 1;
                }
            }
        }
    }

    /// Entity by name (case and surrounding whitespace ignored)
    pub fn get(&self, name: &str) -> Option<&IndexedEntity> {
        let key = cropwise_domain::normalize_key(name);
        self.positions.get(&key).map(|&pos| &self.entities[pos])
    }

    /// Display names in index order
    pub fn names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.record.name.as_str()).collect()
    }

    /// Entities in index order
    pub fn entities(&self) -> &[IndexedEntity] {
        &self.entities
    }

    /// Number of indexed entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// True when an embedder is configured and some entity has a vector
    pub fn embeddings_available(&self) -> bool {
        self.embedder.is_some() && self.entities.iter().any(|e| e.embedding.is_some())
    }

    /// Embed a query with the configured model
    pub fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(query) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("Query embedding failed: {}", e);
                None
            }
        }
    }
}

/// Lowercased, space-joined text keyword search matches against
pub fn searchable_text(record: &EntityRecord, variants: &[EntityRecord]) -> String {
    let mut parts: Vec<String> = vec![record.name.clone()];
    parts.extend(record.aliases.iter().cloned());

    let parent_name = record.name.to_lowercase();
    let variant_names = record
        .variant_names
        .iter()
        .chain(variants.iter().map(|v| &v.name));
    for name in variant_names {
        parts.push(name.clone());
        for token in name.to_lowercase().split_whitespace() {
            if !parent_name.contains(token) {
                parts.push(token.to_string());
            }
        }
    }

    parts.extend(record.scientific_name.iter().cloned());
    parts.extend(record.category.iter().cloned());

    let soil = &record.soil_requirements;
    parts.extend(soil.types.iter().cloned());
    parts.extend(soil.ph_range.iter().map(|ph| format!("pH {}", ph)));
    parts.extend(soil.drainage.iter().cloned());

    let climate = &record.climate_requirements;
    parts.extend(climate.temperature.iter().cloned());
    parts.extend(climate.rainfall.iter().cloned());
    parts.extend(climate.humidity.iter().cloned());
    parts.extend(climate.conditions.iter().cloned());

    parts.extend(record.farming_practices.iter().cloned());
    for pest in &record.pests_diseases {
        parts.extend(pest.name.iter().cloned());
        parts.extend(pest.kind.iter().cloned());
    }
    parts.extend(record.recommendations.iter().cloned());
    parts.extend(record.regional_data.iter().filter_map(|r| r.region.clone()));

    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// SHA-256 hex digest of `text`
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
