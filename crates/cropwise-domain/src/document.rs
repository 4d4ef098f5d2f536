//! Wire shapes exchanged with the external document collection

use crate::entity::EntityRecord;
use crate::lenient;
use serde::{Deserialize, Serialize};

/// A stored entity document
///
/// Parents have `is_variant` absent or `false`. Variants set it to `true`
/// and point at their parent through `parent_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Collection-assigned identifier
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,

    /// Variant marker
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_bool"
    )]
    pub is_variant: Option<bool>,

    /// Parent document id (variants only)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::opt_string"
    )]
    pub parent_id: Option<String>,

    /// Record body
    #[serde(flatten)]
    pub record: EntityRecord,
}

impl EntityDocument {
    /// A parent document
    pub fn parent(id: impl Into<String>, record: EntityRecord) -> Self {
        Self {
            id: id.into(),
            is_variant: None,
            parent_id: None,
            record,
        }
    }

    /// A variant document linked to `parent_id`
    pub fn variant(
        id: impl Into<String>,
        parent_id: impl Into<String>,
        record: EntityRecord,
    ) -> Self {
        Self {
            id: id.into(),
            is_variant: Some(true),
            parent_id: Some(parent_id.into()),
            record,
        }
    }

    /// True when `is_variant` is set to true
    pub fn is_variant(&self) -> bool {
        self.is_variant == Some(true)
    }
}

/// A cached embedding for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingCacheEntry {
    /// Entity normalized key
    pub key: String,
    /// Hash of the searchable text the vector was computed from
    pub text_hash: String,
    /// Embedding model that produced the vector
    #[serde(default)]
    pub model: String,
    /// The embedding
    pub vector: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_document() {
        let value = json!({
            "id": "doc-7",
            "is_variant": true,
            "parent_id": "doc-1",
            "name": "Basmati",
            "category": "cereal"
        });
        let doc: EntityDocument = serde_json::from_value(value).unwrap();
        assert!(doc.is_variant());
        assert_eq!(doc.parent_id.as_deref(), Some("doc-1"));
        assert_eq!(doc.record.name, "Basmati");
        assert_eq!(doc.record.category.as_deref(), Some("cereal"));
    }

    #[test]
    fn test_absent_marker_is_parent() {
        let doc: EntityDocument =
            serde_json::from_value(json!({"id": 3, "name": "Rice"})).unwrap();
        assert!(!doc.is_variant());
        assert_eq!(doc.id, "3");

        let serialized = serde_json::to_value(EntityDocument::parent("a", doc.record)).unwrap();
        assert!(serialized.get("is_variant").is_none());
        assert_eq!(serialized["name"], "Rice");
    }
}
