//! Retrieval module - semantic nearest-neighbor search over symptoms
//!
//! Public interface:
//! - `Retriever` encodes a query, ranks the index, joins symptom metadata
//! - `EmbeddingIndex` the in-memory vector matrix (exhaustive cosine scan)
//! - `RetrievalResult` one ranked, enriched hit
//! - `RetrievalError` load and query failures
//!
//! The scan is O(n·d) per query with no approximate search; that is the
//! scaling limit of this module.

mod error;
mod index;
mod retriever;

pub use error::RetrievalError;
pub use index::EmbeddingIndex;
pub use retriever::{RetrievalResult, Retriever};
