//! Retrieval errors

use crate::knowledge::StoreError;

/// Errors from loading the index or answering a query
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// A stored vector disagrees with the first vector's dimension
    #[error("embedding for symptom {symptom_id} has dimension {actual}, index dimension is {expected}")]
    IndexLoad {
        symptom_id: i64,
        expected: usize,
        actual: usize,
    },

    #[error("index has {vectors} vectors but {ids} ids")]
    IdCountMismatch { vectors: usize, ids: usize },

    /// The embedding engine produces vectors of a different size than the index
    #[error("embedding engine '{model}' produces {engine}-dim vectors, index holds {index}-dim vectors (re-run `symptom-rag embed`)")]
    EngineMismatch {
        model: String,
        engine: usize,
        index: usize,
    },

    #[error("query vector has dimension {actual}, index dimension is {expected}")]
    QueryDimension { expected: usize, actual: usize },

    #[error("failed to encode query: {reason}")]
    Encoding { reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
