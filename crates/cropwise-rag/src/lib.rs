//! Cropwise RAG
//!
//! Answers natural-language questions about crops from a loaded
//! [`KnowledgeStore`](cropwise_store::KnowledgeStore).
//!
//! # Architecture
//!
//! ```text
//! query → RetrievalEngine → build_context → answer_prompt → ProviderAdapter
//!                                 ↓                              ↓
//!                     raw context (no adapter)     answer, or hint + raw context
//! ```
//!
//! # Example Usage
//!
//! ```
//! use cropwise_domain::{EntityDocument, EntityRecord};
//! use cropwise_rag::{AnswerConfig, AnswerGenerator, ChatRequest};
//! use cropwise_store::{InMemoryCollection, KnowledgeStore};
//!
//! let collection = InMemoryCollection::with_documents(vec![
//!     EntityDocument::parent("1", EntityRecord::new("Cassava")),
//! ]);
//! let generator =
//!     AnswerGenerator::new(KnowledgeStore::new(collection), AnswerConfig::default()).unwrap();
//!
//! let response = generator.chat(&ChatRequest::new("how to grow cassava"));
//! assert!(!response.llm_used);
//! assert_eq!(response.entities_used, vec!["Cassava"]);
//! ```

#![warn(missing_docs)]

mod config;
mod context;
mod error;
mod generator;
mod prompt;
mod types;

pub use config::{AnswerConfig, NO_INFORMATION_ANSWER};
pub use context::{build_context, entity_summary, render_summary, ContextDocument};
pub use error::RagError;
pub use generator::AnswerGenerator;
pub use prompt::answer_prompt;
pub use types::{ChatRequest, ChatResponse, EntityInfo};
