//! Key-indexed collection of entity records
//!
//! Records are kept in first-seen order; a side table maps each normalized
//! key to its position so upserts stay O(1).

use crate::entity::EntityRecord;
use crate::merge::{normalize_key, Merge};
use std::collections::HashMap;

/// Outcome of folding a record into an [`EntityIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new key was created at this position
    Inserted(usize),
    /// The record was merged into an existing entry at this position
    Merged(usize),
}

/// Ordered map from normalized key to merged [`EntityRecord`]
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    records: Vec<EntityRecord>,
    positions: HashMap<String, usize>,
}

impl EntityIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a record
    ///
    /// Returns `None` when the record has no usable name.
    ///
    /// # Examples
    ///
    /// ```
    /// use cropwise_domain::{EntityIndex, EntityRecord, Upsert};
    ///
    /// let mut index = EntityIndex::new();
    /// assert_eq!(index.upsert(EntityRecord::new("Rice")), Some(Upsert::Inserted(0)));
    /// assert_eq!(index.upsert(EntityRecord::new(" rice")), Some(Upsert::Merged(0)));
    /// assert_eq!(index.upsert(EntityRecord::new("  ")), None);
    /// assert_eq!(index.len(), 1);
    /// ```
    pub fn upsert(&mut self, record: EntityRecord) -> Option<Upsert> {
        let key = record.key();
        if key.is_empty() {
            return None;
        }

        match self.positions.get(&key) {
            Some(&pos) => {
                self.records[pos].merge_from(&record);
                Some(Upsert::Merged(pos))
            }
            None => {
                let pos = self.records.len();
                self.records.push(record);
                self.positions.insert(key, pos);
                Some(Upsert::Inserted(pos))
            }
        }
    }

    /// Look up a record by name (normalized internally)
    pub fn get(&self, name: &str) -> Option<&EntityRecord> {
        self.positions
            .get(&normalize_key(name))
            .map(|&pos| &self.records[pos])
    }

    /// Mutable lookup by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut EntityRecord> {
        match self.positions.get(&normalize_key(name)) {
            Some(&pos) => self.records.get_mut(pos),
            None => None,
        }
    }

    /// Iterate records in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been added
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Consume the index, returning records in first-seen order
    pub fn into_records(self) -> Vec<EntityRecord> {
        self.records
    }
}
