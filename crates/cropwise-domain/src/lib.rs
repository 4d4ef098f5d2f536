//! Cropwise Domain Layer
//!
//! This crate contains the knowledge model shared by every other Cropwise crate.
//! It defines the entity record a document is distilled into, the merge rules
//! that keep those records deduplicated, and the trait interfaces the
//! infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Chunk**: A bounded slice of a document submitted independently for extraction
//! - **EntityRecord**: The merged representation of one crop, keyed by its normalized name
//! - **Merge**: First non-null scalar wins, lists are ordered sets, groups merge recursively
//! - **Provenance**: Which documents, chunks and extraction runs contributed to a record
//! - **ErrorKind**: Tagged classification of provider failures
//!
//! ## Architecture
//!
//! - Pure data and merge logic only
//! - Infrastructure implementations (LLM backends, collections) live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod document;
pub mod entity;
pub mod failure;
pub mod index;
pub mod merge;
pub mod provenance;
pub mod traits;

mod lenient;

// Re-exports for convenience
pub use chunk::Chunk;
pub use document::{EmbeddingCacheEntry, EntityDocument};
pub use entity::{
    ClimateRequirements, EntityRecord, NutrientRate, Nutrients, OtherNutrient, PestDisease,
    PlantingInfo, RegionalNote, SoilRequirements, YieldInfo,
};
pub use failure::{Classify, ErrorKind, ProviderFailure};
pub use index::{EntityIndex, Upsert};
pub use merge::{normalize_key, Merge};
pub use provenance::{ExtractionRunId, Provenance, ValidationMetadata};
pub use traits::{EntityCollection, Generation, GenerationRequest, LlmProvider, Usage};
