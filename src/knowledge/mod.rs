//! Knowledge store - normalized symptom knowledge base in SQLite
//!
//! Public interface:
//! - `KnowledgeStore` for schema, lookups and embedding blobs
//! - `SymptomRecord` the immutable record retrieval joins against
//! - `ingest` for CSV → relational ingestion
//!
//! # Schema
//!
//! ```text
//! symptoms(id, symptom UNIQUE)
//! conditions(id, condition UNIQUE)      symptom_condition(symptom_id, condition_id)
//! questions(id, question UNIQUE)        symptom_question(symptom_id, question_id)
//! symptom_embeddings(symptom_id PK, embedding BLOB)
//! embedding_metadata(model_name, dimension, symptom_count, generated_at)
//! ```

pub mod ingest;
mod store;
mod types;

pub use store::{decode_vector, encode_vector, EmbeddingMetadata, KnowledgeStore, StoreStats};
pub use types::{StoreError, SymptomRecord};
