//! In-memory embedding index
//!
//! A dense matrix of stored vectors plus the parallel list of symptom ids.
//! Norms are precomputed at load so a query costs one dot product per row.

use crate::embeddings::{cosine_from_parts, dot, l2_norm};

use super::RetrievalError;

/// Read-only vector index, built once at startup
#[derive(Debug, Clone, Default)]
pub struct EmbeddingIndex {
    vectors: Vec<Vec<f32>>,
    norms: Vec<f32>,
    ids: Vec<i64>,
    dimension: usize,
}

impl EmbeddingIndex {
    /// Build an index from parallel vector and id lists
    ///
    /// Every vector must have the first vector's dimension.
    pub fn from_parts(vectors: Vec<Vec<f32>>, ids: Vec<i64>) -> Result<Self, RetrievalError> {
        if vectors.len() != ids.len() {
            return Err(RetrievalError::IdCountMismatch {
                vectors: vectors.len(),
                ids: ids.len(),
            });
        }

        let dimension = vectors.first().map(Vec::len).unwrap_or(0);
        for (vector, &symptom_id) in vectors.iter().zip(&ids) {
            if vector.len() != dimension {
                return Err(RetrievalError::IndexLoad {
                    symptom_id,
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        let norms = vectors.iter().map(|v| l2_norm(v)).collect();
        Ok(Self {
            vectors,
            norms,
            ids,
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension (0 for an empty index)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Symptom ids in index order
    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Top `k` (symptom id, cosine score) pairs, best first
    ///
    /// Equal scores keep index order. An empty index returns nothing for
    /// any query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(i64, f32)>, RetrievalError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RetrievalError::QueryDimension {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_norm = l2_norm(query);
        let mut scored: Vec<(i64, f32)> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .zip(&self.ids)
            .map(|((vector, &norm), &id)| (id, cosine_from_parts(dot(query, vector), query_norm, norm)))
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }
}
