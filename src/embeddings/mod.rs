//! Embeddings module - Generate semantic embeddings for symptom text
//!
//! Provides trait-based abstraction for embedding generation with an ONNX
//! backend and a deterministic hashing backend. The backend is selected by
//! the `[embeddings]` section of the project config.

mod database;
mod hash;
mod onnx;
mod similarity;

pub use database::{generate_symptom_embeddings, EmbeddingReport};
pub use hash::HashEmbedder;
pub use onnx::{ModelFiles, OnnxEmbedder};
pub use similarity::{cosine_from_parts, cosine_similarity, dot, l2_norm};

use anyhow::Result;
use std::path::Path;

use crate::project::{EmbeddingBackend, EmbeddingsSection};

/// Trait for embedding generation engines
///
/// Requires Send so a retriever holding one behind a mutex can be shared
/// across session threads.
pub trait EmbeddingEngine: Send {
    /// Generate embedding for a single text
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding for a query text (with model-specific prefix if needed)
    ///
    /// For asymmetric models (e.g., BGE, E5), this applies query-specific formatting.
    /// For symmetric models (e.g., all-MiniLM), this is identical to embed().
    fn embed_query(&mut self, text: &str) -> Result<Vec<f32>> {
        self.embed(text)
    }

    /// Generate embedding for a passage text (with model-specific prefix if needed)
    fn embed_passage(&mut self, text: &str) -> Result<Vec<f32>> {
        self.embed(text)
    }

    /// Get embedding dimension (e.g., 384 for all-MiniLM-L6-v2)
    fn dimension(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Create the embedder configured in `[embeddings]`
///
/// Relative model directories resolve against `project_root`.
pub fn create_embedder(
    section: &EmbeddingsSection,
    project_root: &Path,
) -> Result<Box<dyn EmbeddingEngine>> {
    match section.backend {
        EmbeddingBackend::Hash => Ok(Box::new(HashEmbedder::new(section.dimension))),
        EmbeddingBackend::Onnx => create_onnx_embedder(section, project_root),
    }
}

/// Load the ONNX model named by the section
fn create_onnx_embedder(
    section: &EmbeddingsSection,
    project_root: &Path,
) -> Result<Box<dyn EmbeddingEngine>> {
    let model_dir = project_root.join(section.model_dir());
    Ok(Box::new(OnnxEmbedder::load(section, &model_dir)?))
}
