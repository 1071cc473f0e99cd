//! CLI command implementations
//!
//! Each command loads the project config from the project root, opens what it
//! needs, and reports to stdout. Library errors are wrapped with `anyhow`
//! context here, at the edge.

pub mod chat;
pub mod embed;
pub mod ingest;
pub mod init;
pub mod retrieve;
pub mod serve;
pub mod stats;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use symptom_rag::embeddings;
use symptom_rag::knowledge::KnowledgeStore;
use symptom_rag::project::{self, ProjectConfig};
use symptom_rag::retrieval::Retriever;

/// Project root plus its loaded config
pub struct Project {
    pub root: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Load config for `root`; defaults apply when no config file exists
    pub fn load(root: &Path) -> Result<Self> {
        let config = project::load(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    /// Absolute path of the knowledge store
    pub fn store_path(&self) -> PathBuf {
        self.root.join(&self.config.store.path)
    }

    pub fn open_store(&self) -> Result<KnowledgeStore> {
        let path = self.store_path();
        KnowledgeStore::open(&path)
            .with_context(|| format!("Failed to open knowledge store at {}", path.display()))
    }

    pub fn create_embedder(&self) -> Result<Box<dyn embeddings::EmbeddingEngine>> {
        embeddings::create_embedder(&self.config.embeddings, &self.root)
            .context("Failed to create embedding engine")
    }

    /// Load the embedding index and metadata into a shareable retriever
    pub fn load_retriever(&self) -> Result<Arc<Retriever>> {
        let store = self.open_store()?;
        let embedder = self.create_embedder()?;
        let retriever = Retriever::load(&store, embedder).context("Failed to load embedding index")?;
        Ok(Arc::new(retriever))
    }
}
