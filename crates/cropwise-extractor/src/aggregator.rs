//! Merge per-chunk fragments into entity records
//!
//! Each fragment is expected to carry a `crops` list (`entities` is accepted
//! as an alias) plus general findings. Entities are folded into an
//! [`EntityIndex`] keyed by normalized name, so merging is associative and
//! idempotent. Fragments are consumed in the order given, which callers keep
//! equal to chunk-id order.

use crate::parser::StructuredData;
use crate::types::{AggregatedExtraction, ChunkFragment, GeneralFindings};
use cropwise_domain::{EntityIndex, EntityRecord, Merge, Upsert};
use serde_json::Value;
use tracing::{debug, warn};

const ENTITY_KEYS: [&str; 2] = ["crops", "entities"];

/// Accumulates fragments into merged entities
#[derive(Debug, Default)]
pub struct ChunkAggregator {
    index: EntityIndex,
    general: GeneralFindings,
    skipped: usize,
}

impl ChunkAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge every fragment and return the result
    pub fn combine(fragments: &[ChunkFragment]) -> AggregatedExtraction {
        let mut aggregator = Self::new();
        for fragment in fragments {
            aggregator.add_fragment(fragment.chunk_id, &fragment.data);
        }
        aggregator.finish()
    }

    /// Fold one fragment in
    pub fn add_fragment(&mut self, chunk_id: usize, data: &StructuredData) {
        for key in ENTITY_KEYS {
            let Some(entities) = data.get(key) else {
                continue;
            };
            match entities {
                Value::Array(items) => {
                    for item in items {
                        self.add_entity(chunk_id, item);
                    }
                }
                Value::Object(_) => self.add_entity(chunk_id, entities),
                _ => {}
            }
        }

        self.general
            .practices
            .merge_from(&texts(data.get("general_practices")));
        self.general
            .recommendations
            .merge_from(&texts(data.get("general_recommendations")));
        self.general
            .sources
            .merge_from(&texts(data.get("source_summary")));
    }

    fn add_entity(&mut self, chunk_id: usize, value: &Value) {
        if !value.is_object() {
            warn!("Chunk {}: skipping non-object entity entry", chunk_id);
            self.skipped += 1;
            return;
        }

        let mut record: EntityRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Chunk {}: skipping invalid entity: {}", chunk_id, e);
                self.skipped += 1;
                return;
            }
        };
        record.name = record.name.trim().to_string();
        record.provenance.add_chunk(chunk_id);

        match self.index.upsert(record) {
            Some(Upsert::Inserted(pos)) => debug!("Chunk {}: new entity at {}", chunk_id, pos),
            Some(Upsert::Merged(pos)) => debug!("Chunk {}: merged into entity {}", chunk_id, pos),
            None => {
                warn!("Chunk {}: skipping entity without a name", chunk_id);
                self.skipped += 1;
            }
        }
    }

    /// Number of entity entries rejected so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of distinct entities so far
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no entity has been added
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Consume the aggregator
    pub fn finish(self) -> AggregatedExtraction {
        let entities = self.index.into_records();
        AggregatedExtraction {
            total_entities: entities.len(),
            entities,
            general: self.general,
        }
    }
}

/// Read a string or list of strings, dropping blanks and duplicates
fn texts(value: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |v: &Value| {
        let text = match v {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return,
        };
        if !text.is_empty() && !out.contains(&text) {
            out.push(text);
        }
    };
    match value {
        Some(Value::Array(items)) => items.iter().for_each(&mut push),
        Some(other) => push(other),
        None => {}
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn fragment(chunk_id: usize, data: Value) -> ChunkFragment {
        match data {
            Value::Object(map) => ChunkFragment {
                chunk_id,
                data: map,
                usage: None,
            },
            _ => panic!("fragment data must be an object"),
        }
    }

    #[test]
    fn test_merges_by_normalized_key() {
        let fragments = vec![
            fragment(0, json!({"crops": [{"name": "Rice", "soil_requirements": {"ph_range": "6-7"}}]})),
            fragment(1, json!({"crops": [{"name": " rice ", "soil_requirements": {"ph_range": "5-6", "drainage": "poor"}}]})),
        ];
        let result = ChunkAggregator::combine(&fragments);
        assert_eq!(result.total_entities, 1);
        let rice = &result.entities[0];
        assert_eq!(rice.name, "Rice");
        assert_eq!(rice.soil_requirements.ph_range.as_deref(), Some("6-7"));
        assert_eq!(rice.soil_requirements.drainage.as_deref(), Some("poor"));
        assert_eq!(rice.provenance.chunk_ids, vec![0, 1]);
    }

    #[test]
    fn test_disjoint_lists_sum() {
        let fragments = vec![
            fragment(0, json!({"crops": [{"name": "Maize", "farming_practices": ["ridging", "mulching"]}]})),
            fragment(1, json!({"crops": [{"name": "MAIZE", "farming_practices": ["intercropping"]}]})),
        ];
        let result = ChunkAggregator::combine(&fragments);
        assert_eq!(
            result.entities[0].farming_practices,
            vec!["ridging", "mulching", "intercropping"]
        );
    }

    #[test]
    fn test_general_findings_and_entities_alias() {
        let fragments = vec![
            fragment(0, json!({
                "entities": [{"name": "Teff"}],
                "general_practices": ["crop rotation", "crop rotation"],
                "general_recommendations": "test soil yearly",
                "source_summary": "Cereal guide"
            })),
            fragment(1, json!({"crops": [], "general_practices": ["crop rotation", "terracing"]})),
        ];
        let result = ChunkAggregator::combine(&fragments);
        assert_eq!(result.entities[0].name, "Teff");
        assert_eq!(result.general.practices, vec!["crop rotation", "terracing"]);
        assert_eq!(result.general.recommendations, vec!["test soil yearly"]);
        assert_eq!(result.general.sources, vec!["Cereal guide"]);
    }

    #[test]
    fn test_invalid_entities_are_skipped() {
        let mut aggregator = ChunkAggregator::new();
        let data = json!({"crops": [{"category": "fruit"}, "Banana", {"name": "  "}, {"name": "Mango"}]});
        if let Value::Object(map) = data {
            aggregator.add_fragment(3, &map);
        }
        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.skipped(), 3);
        assert_eq!(aggregator.finish().entities[0].provenance.chunk_ids, vec![3]);
    }

    #[test]
    fn test_first_seen_order() {
        let fragments = vec![
            fragment(0, json!({"crops": [{"name": "Barley"}, {"name": "Oats"}]})),
            fragment(1, json!({"crops": [{"name": "Rye"}, {"name": "barley"}]})),
        ];
        let names: Vec<String> = ChunkAggregator::combine(&fragments)
            .entities
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Barley", "Oats", "Rye"]);
    }

    proptest! {
        #[test]
        fn prop_combining_twice_is_idempotent(
            practices in prop::collection::vec("[a-e]{1,3}", 0..6),
            ph in prop::option::of("[0-9]-[0-9]"),
        ) {
            let frag = fragment(0, json!({"crops": [{
                "name": "Rice",
                "farming_practices": practices,
                "soil_requirements": {"ph_range": ph}
            }]}));
            let once = ChunkAggregator::combine(std::slice::from_ref(&frag));
            let twice = ChunkAggregator::combine(&[frag.clone(), frag]);
            prop_assert_eq!(once.entities, twice.entities);
        }
    }
}
