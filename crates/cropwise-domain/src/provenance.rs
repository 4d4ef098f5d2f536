//! Provenance tracking for entity records

use crate::lenient;
use crate::merge::Merge;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for one extraction run, based on UUIDv7
///
/// UUIDv7 ids sort chronologically, so runs stamped into a record's
/// provenance can be ordered without a separate timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtractionRunId(u128);

impl ExtractionRunId {
    /// Generate a new run id
    ///
    /// # Examples
    ///
    /// ```
    /// use cropwise_domain::ExtractionRunId;
    ///
    /// let id = ExtractionRunId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a run id from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a run id from its UUID string form
    ///
    /// # Examples
    ///
    /// ```
    /// use cropwise_domain::ExtractionRunId;
    ///
    /// let id = ExtractionRunId::new();
    /// let parsed = ExtractionRunId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid run id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Milliseconds since the Unix epoch at which the run started
    pub fn timestamp(&self) -> u64 {
        // top 48 bits of a UUIDv7
        (self.0 >> 80) as u64
    }
}

impl Default for ExtractionRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExtractionRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Validation state attached to a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationMetadata {
    /// e.g. "unverified", "verified"
    #[serde(deserialize_with = "lenient::opt_string")]
    pub status: Option<String>,

    /// How the record was validated
    #[serde(deserialize_with = "lenient::opt_string")]
    pub method: Option<String>,

    /// Free-form notes
    #[serde(deserialize_with = "lenient::opt_string")]
    pub notes: Option<String>,
}

impl Merge for ValidationMetadata {
    fn merge_from(&mut self, other: &Self) {
        self.status.merge_from(&other.status);
        self.method.merge_from(&other.method);
        self.notes.merge_from(&other.notes);
    }
}

/// Which documents, chunks and runs contributed to a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provenance {
    /// Source document identifiers
    #[serde(deserialize_with = "lenient::string_list")]
    pub source_documents: Vec<String>,

    /// Chunk ids whose fragments mentioned the entity
    pub chunk_ids: Vec<usize>,

    /// Extraction runs (UUID strings) that produced fragments
    #[serde(deserialize_with = "lenient::string_list")]
    pub extraction_runs: Vec<String>,

    /// Validation metadata
    #[serde(deserialize_with = "lenient::group")]
    pub validation: ValidationMetadata,
}

impl Provenance {
    /// Record a source document
    pub fn add_source(&mut self, document_id: &str) {
        let document_id = document_id.trim();
        if !document_id.is_empty() && !self.source_documents.iter().any(|d| d == document_id) {
            self.source_documents.push(document_id.to_string());
        }
    }

    /// Record a contributing chunk
    pub fn add_chunk(&mut self, chunk_id: usize) {
        if !self.chunk_ids.contains(&chunk_id) {
            self.chunk_ids.push(chunk_id);
        }
    }

    /// Record an extraction run
    pub fn add_run(&mut self, run: ExtractionRunId) {
        let run = run.to_string();
        if !self.extraction_runs.contains(&run) {
            self.extraction_runs.push(run);
        }
    }
}

impl Merge for Provenance {
    fn merge_from(&mut self, other: &Self) {
        self.source_documents.merge_from(&other.source_documents);
        self.chunk_ids.merge_from(&other.chunk_ids);
        self.extraction_runs.merge_from(&other.extraction_runs);
        self.validation.merge_from(&other.validation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_timestamp_is_recent() {
        let id = ExtractionRunId::new();
        // 2020-01-01 in milliseconds
        assert!(id.timestamp() > 1_577_836_800_000);
    }

    #[test]
    fn test_run_id_rejects_garbage() {
        assert!(ExtractionRunId::from_string("not-a-uuid").is_err());
    }

    #[test]
    fn test_add_helpers_dedup() {
        let mut p = Provenance::default();
        let run = ExtractionRunId::from_value(42);
        p.add_source("guide.pdf");
        p.add_source(" guide.pdf ");
        p.add_source("");
        p.add_chunk(2);
        p.add_chunk(2);
        p.add_run(run);
        p.add_run(run);
        assert_eq!(p.source_documents, vec!["guide.pdf"]);
        assert_eq!(p.chunk_ids, vec![2]);
        assert_eq!(p.extraction_runs.len(), 1);
    }

    #[test]
    fn test_chunk_ids_union_on_merge() {
        let mut a = Provenance {
            chunk_ids: vec![0, 1],
            ..Provenance::default()
        };
        let b = Provenance {
            chunk_ids: vec![1, 3],
            ..Provenance::default()
        };
        a.merge_from(&b);
        assert_eq!(a.chunk_ids, vec![0, 1, 3]);
    }
}
