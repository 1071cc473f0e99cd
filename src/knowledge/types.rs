//! Domain types for the knowledge store

use serde::{Deserialize, Serialize};

/// One symptom with its linked conditions and follow-up questions
///
/// Created once during ingestion and never mutated; a re-ingestion replaces
/// the whole knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub id: i64,
    /// Normalized (trimmed, lowercase) symptom text
    pub text: String,
    /// Linked conditions in ingestion order
    pub conditions: Vec<String>,
    /// Linked follow-up questions in ingestion order
    pub questions: Vec<String>,
}

/// Knowledge store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("embedding blob for symptom {symptom_id} is {len} bytes, not a whole number of f32 values")]
    CorruptVector { symptom_id: i64, len: usize },

    #[error("embedding for symptom {symptom_id} has no symptom row")]
    MissingSymptom { symptom_id: i64 },

    #[error("failed to open knowledge store: {reason}")]
    Open { reason: String },
}
