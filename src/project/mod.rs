//! Project module - Unified project configuration
//!
//! Manages `.symptom-rag/config.toml`: knowledge store location, embedding
//! backend, retrieval depth, the dialogue follow-up bound and server address.
//!
//! # Example
//!
//! ```no_run
//! use symptom_rag::project;
//! use std::path::Path;
//!
//! let path = Path::new(".");
//! let mut config = project::load(path)?;
//! println!("Follow-up bound: {:?}", config.dialogue.followup_bound());
//!
//! config.dialogue.unbounded = true;
//! project::save(path, &config)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod internal;

use anyhow::Result;
use std::path::Path;

// Re-export config types
pub use internal::{
    DialogueSection, EmbeddingBackend, EmbeddingsSection, ProjectConfig, RetrievalSection,
    ServeSection, StoreSection,
};

/// Check if a directory is a symptom-rag project (has .symptom-rag/)
pub fn is_project(path: &Path) -> bool {
    internal::is_project(path)
}

/// Load project config from `.symptom-rag/config.toml`
///
/// Returns default config if file doesn't exist.
pub fn load(project_path: &Path) -> Result<ProjectConfig> {
    internal::load(project_path)
}

/// Save project config to `.symptom-rag/config.toml`
///
/// Creates `.symptom-rag/` directory if it doesn't exist.
pub fn save(project_path: &Path, config: &ProjectConfig) -> Result<()> {
    internal::save(project_path, config)
}
