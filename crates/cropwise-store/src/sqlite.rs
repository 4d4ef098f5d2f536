//! SQLite-backed entity collection

use crate::StoreError;
use cropwise_domain::{EmbeddingCacheEntry, EntityCollection, EntityDocument, EntityRecord};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::debug;

/// SQLite implementation of [`EntityCollection`]
///
/// Record bodies are stored as JSON; embedding vectors as little-endian
/// `f32` blobs.
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteCollection instance.
pub struct SqliteCollection {
    conn: Connection,
}

type DocumentRow = (String, Option<bool>, Option<String>, String);

impl SqliteCollection {
    /// Open (or create) a collection at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cropwise_store::SqliteCollection;
    ///
    /// let collection = SqliteCollection::new("cropwise.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let collection = Self { conn };
        collection.initialize_schema()?;
        Ok(collection)
    }

    /// Open an in-memory collection
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(include_str!("schema.sql"))?;

        // caches written before vectors were tagged with their model
        let has_model = self
            .conn
            .prepare("SELECT 1 FROM pragma_table_info('embedding_cache') WHERE name = 'model'")?
            .exists([])?;
        if !has_model {
            debug!("Adding model column to embedding cache");
            self.conn.execute(
                "ALTER TABLE embedding_cache ADD COLUMN model TEXT NOT NULL DEFAULT ''",
                [],
            )?;
        }
        Ok(())
    }

    /// Insert or replace a document by id
    pub fn insert_document(&mut self, document: &EntityDocument) -> Result<(), StoreError> {
        let body = serde_json::to_string(&document.record)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO entity_documents (id, is_variant, parent_id, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![document.id, document.is_variant, document.parent_id, body],
        )?;
        Ok(())
    }

    /// Number of stored documents
    pub fn document_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entity_documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn query_documents(&self, sql: &str) -> Result<Vec<EntityDocument>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| -> rusqlite::Result<DocumentRow> {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, is_variant, parent_id, body)| -> Result<EntityDocument, StoreError> {
                let record: EntityRecord = serde_json::from_str(&body)?;
                Ok(EntityDocument {
                    id,
                    is_variant,
                    parent_id,
                    record,
                })
            })
            .collect()
    }
}

fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_vector(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::InvalidData(format!(
            "Embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

impl EntityCollection for SqliteCollection {
    type Error = StoreError;

    fn find_parents(&self) -> Result<Vec<EntityDocument>, Self::Error> {
        self.query_documents(
            "SELECT id, is_variant, parent_id, body FROM entity_documents
             WHERE is_variant IS NULL OR is_variant = 0 ORDER BY rowid",
        )
    }

    fn find_variants(&self) -> Result<Vec<EntityDocument>, Self::Error> {
        self.query_documents(
            "SELECT id, is_variant, parent_id, body FROM entity_documents
             WHERE is_variant = 1 ORDER BY rowid",
        )
    }

    fn load_embeddings(&self) -> Result<Vec<EmbeddingCacheEntry>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT entity_key, text_hash, model, vector FROM embedding_cache")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let entries = rows
            .into_iter()
            .map(|(key, text_hash, model, blob)| -> Result<EmbeddingCacheEntry, StoreError> {
                Ok(EmbeddingCacheEntry {
                    key,
                    text_hash,
                    model,
                    vector: bytes_to_vector(&blob)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        debug!("Loaded {} cached embeddings", entries.len());
        Ok(entries)
    }

    fn upsert_embedding(&mut self, entry: &EmbeddingCacheEntry) -> Result<(), Self::Error> {
        self.conn.execute(
            "INSERT INTO embedding_cache (entity_key, text_hash, model, vector) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(entity_key) DO UPDATE SET
                 text_hash = excluded.text_hash, model = excluded.model, vector = excluded.vector",
            params![entry.key, entry.text_hash, entry.model, vector_to_bytes(&entry.vector)],
        )?;
        Ok(())
    }
}
