//! Query-time retriever
//!
//! Owns the embedding index, the embedding engine that built it, and a
//! preloaded copy of the symptom metadata, so a query never touches SQLite.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::{EmbeddingIndex, RetrievalError};
use crate::embeddings::EmbeddingEngine;
use crate::knowledge::{KnowledgeStore, StoreError, SymptomRecord};

/// One ranked hit, joined with its symptom record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub symptom_id: i64,
    /// Cosine similarity in [-1, 1], higher is more relevant
    pub score: f32,
    pub symptom: String,
    pub conditions: Vec<String>,
    pub questions: Vec<String>,
}

/// Semantic retriever over the symptom knowledge base
///
/// Read-only after construction; share it across sessions with `Arc`.
pub struct Retriever {
    index: EmbeddingIndex,
    records: HashMap<i64, SymptomRecord>,
    // ONNX inference needs &mut, so queries serialize on this lock
    embedder: Mutex<Box<dyn EmbeddingEngine>>,
}

impl Retriever {
    /// Build a retriever from parts already in memory
    pub fn new(
        index: EmbeddingIndex,
        records: impl IntoIterator<Item = SymptomRecord>,
        embedder: Box<dyn EmbeddingEngine>,
    ) -> Result<Self, RetrievalError> {
        let records: HashMap<i64, SymptomRecord> =
            records.into_iter().map(|r| (r.id, r)).collect();

        if let Some(&missing) = index.ids().iter().find(|&&id| !records.contains_key(&id)) {
            return Err(StoreError::MissingSymptom {
                symptom_id: missing,
            }
            .into());
        }

        if !index.is_empty() && index.dimension() != embedder.dimension() {
            return Err(RetrievalError::EngineMismatch {
                model: embedder.model_name().to_string(),
                engine: embedder.dimension(),
                index: index.dimension(),
            });
        }

        Ok(Self {
            index,
            records,
            embedder: Mutex::new(embedder),
        })
    }

    /// Load every stored vector and its metadata from the knowledge store
    pub fn load(
        store: &KnowledgeStore,
        embedder: Box<dyn EmbeddingEngine>,
    ) -> Result<Self, RetrievalError> {
        let (vectors, ids) = store.load_all_vectors()?;
        let index = EmbeddingIndex::from_parts(vectors, ids)?;

        if let Some(meta) = store.embedding_metadata()? {
            if meta.model_name != embedder.model_name() {
                warn!(
                    index_model = %meta.model_name,
                    engine_model = %embedder.model_name(),
                    "Index was built with a different model; scores may be meaningless"
                );
            }
        }

        let mut records = Vec::with_capacity(index.len());
        for &id in index.ids() {
            let record = store
                .record(id)?
                .ok_or(StoreError::MissingSymptom { symptom_id: id })?;
            records.push(record);
        }

        info!(
            vectors = index.len(),
            dimension = index.dimension(),
            "Loaded embedding index"
        );
        Self::new(index, records, embedder)
    }

    /// Rank symptoms against `query`, best first, at most `top_k` results
    ///
    /// An empty query is encoded like any other text; an empty index
    /// yields no results.
    pub fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalResult>, RetrievalError> {
        if self.index.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .lock()
            .embed_query(query)
            .map_err(|e| RetrievalError::Encoding {
                reason: format!("{:#}", e),
            })?;

        let hits = self.index.search(&query_vector, top_k)?;
        debug!(query, hits = hits.len(), "Retrieved symptoms");

        hits.into_iter()
            .map(|(symptom_id, score)| -> Result<RetrievalResult, RetrievalError> {
                let record = self
                    .records
                    .get(&symptom_id)
                    .ok_or(StoreError::MissingSymptom { symptom_id })?;
                Ok(RetrievalResult {
                    symptom_id,
                    score,
                    symptom: record.text.clone(),
                    conditions: record.conditions.clone(),
                    questions: record.questions.clone(),
                })
            })
            .collect()
    }

    /// Number of indexed symptoms
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn model_name(&self) -> String {
        self.embedder.lock().model_name().to_string()
    }
}
