//! Embedding generation for the knowledge store
//!
//! Embeds every symptom in passage mode, then swaps the stored vectors in a
//! single transaction. A failed run leaves the previous index intact.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::embeddings::EmbeddingEngine;
use crate::knowledge::KnowledgeStore;

/// Summary of an embedding run
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingReport {
    pub model_name: String,
    pub dimension: usize,
    pub symptom_count: usize,
}

/// Generate embeddings for all symptoms
///
/// Nothing is written until every symptom has a vector of the engine's
/// dimension, so an index never mixes models or misses rows.
pub fn generate_symptom_embeddings(
    store: &mut KnowledgeStore,
    embedder: &mut dyn EmbeddingEngine,
) -> Result<EmbeddingReport> {
    if let Some(previous) = store.embedding_metadata()? {
        if previous.model_name != embedder.model_name() {
            warn!(
                previous = %previous.model_name,
                current = %embedder.model_name(),
                "Replacing embeddings built with a different model"
            );
        }
    }

    let symptoms = store.symptoms()?;
    let dimension = embedder.dimension();

    let mut embeddings = Vec::with_capacity(symptoms.len());
    for (id, text) in symptoms {
        let embedding = embedder
            .embed_passage(&text)
            .with_context(|| format!("Failed to generate embedding for symptom {}", id))?;

        if embedding.len() != dimension {
            bail!(
                "Embedding dimension mismatch for symptom {}: expected {}, got {}",
                id,
                dimension,
                embedding.len()
            );
        }

        debug!(symptom_id = id, "Embedded symptom");
        embeddings.push((id, embedding));
    }

    store
        .replace_embeddings(embedder.model_name(), dimension, &embeddings)
        .context("Failed to store symptom embeddings")?;
    info!(
        count = embeddings.len(),
        model = %embedder.model_name(),
        dimension,
        "Generated symptom embeddings"
    );

    Ok(EmbeddingReport {
        model_name: embedder.model_name().to_string(),
        dimension,
        symptom_count: embeddings.len(),
    })
}
