//! Internal implementation for project module
//!
//! Handles .symptom-rag/config.toml - unified project configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

// =============================================================================
// Config Types - Unified Schema
// =============================================================================

/// Project configuration stored in .symptom-rag/config.toml
/// All sections are optional with defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub embeddings: EmbeddingsSection,
    #[serde(default)]
    pub retrieval: RetrievalSection,
    #[serde(default)]
    pub dialogue: DialogueSection,
    #[serde(default)]
    pub serve: ServeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// SQLite knowledge store, relative to the project root
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    paths::default_store_path()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Which embedding engine encodes queries and symptoms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// ONNX Runtime sentence encoder (tokenizer + mean pooling)
    Onnx,
    /// Deterministic feature-hashing encoder, no model files needed
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsSection {
    #[serde(default = "default_backend")]
    pub backend: EmbeddingBackend,
    /// Embedding model to use
    #[serde(default = "default_model")]
    pub model: String,
    /// Vector dimension produced by the model
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Override for the model directory (default: resources/models/{model})
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,
    /// Query prefix for asymmetric models (e.g. "query: " for E5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_prefix: Option<String>,
    /// Passage prefix for asymmetric models (e.g. "passage: " for E5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage_prefix: Option<String>,
}

fn default_backend() -> EmbeddingBackend {
    EmbeddingBackend::Onnx
}
fn default_model() -> String {
    "all-minilm-l6-v2".to_string()
}
fn default_dimension() -> usize {
    384
}

impl EmbeddingsSection {
    /// Resolved model directory
    pub fn model_dir(&self) -> PathBuf {
        self.model_dir
            .clone()
            .unwrap_or_else(|| paths::models::model_dir(&self.model))
    }
}

impl Default for EmbeddingsSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_model(),
            dimension: default_dimension(),
            model_dir: None,
            query_prefix: None,
            passage_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSection {
    /// Number of ranked symptoms returned by `retrieve`
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalSection {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSection {
    /// Follow-up questions allowed before a diagnosis is forced
    #[serde(default = "default_max_followups")]
    pub max_followups: usize,
    /// Ignore `max_followups` and never force a diagnosis
    #[serde(default)]
    pub unbounded: bool,
}

fn default_max_followups() -> usize {
    3
}

impl DialogueSection {
    /// Effective bound: `None` means unbounded
    pub fn followup_bound(&self) -> Option<usize> {
        if self.unbounded {
            None
        } else {
            Some(self.max_followups)
        }
    }
}

impl Default for DialogueSection {
    fn default() -> Self {
        Self {
            max_followups: default_max_followups(),
            unbounded: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds a dialogue session may sit idle before it is evicted
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Live sessions allowed at once; creation beyond this is refused
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    50052
}
fn default_session_ttl_secs() -> u64 {
    30 * 60
}
fn default_max_sessions() -> usize {
    1024
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

// =============================================================================
// Detection
// =============================================================================

/// Check if a directory is a symptom-rag project
pub fn is_project(path: &Path) -> bool {
    paths::project_dir(path).exists()
}

// =============================================================================
// Config Load/Save
// =============================================================================

/// Load project config from .symptom-rag/config.toml
pub fn load(project_path: &Path) -> Result<ProjectConfig> {
    let path = paths::config_path(project_path);

    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read project config: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse project config: {}", path.display()))
}

/// Save project config to .symptom-rag/config.toml
pub fn save(project_path: &Path, config: &ProjectConfig) -> Result<()> {
    let path = paths::config_path(project_path);

    // Ensure .symptom-rag directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(&path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ProjectConfig::default();
        assert_eq!(config.embeddings.backend, EmbeddingBackend::Onnx);
        assert_eq!(config.embeddings.model, "all-minilm-l6-v2");
        assert_eq!(config.embeddings.dimension, 384);
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.dialogue.followup_bound(), Some(3));
        assert_eq!(config.serve.port, 50052);
        assert_eq!(config.serve.session_ttl_secs, 1800);
        assert_eq!(config.serve.max_sessions, 1024);
    }

    #[test]
    fn test_config_serialization() {
        let config = ProjectConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[embeddings]"));
        assert!(toml_str.contains("[dialogue]"));
        assert!(toml_str.contains("backend = \"onnx\""));
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let project_path = tmp.path();

        let mut config = ProjectConfig::default();
        config.embeddings.backend = EmbeddingBackend::Hash;
        config.dialogue.max_followups = 1;

        save(project_path, &config).unwrap();
        let loaded = load(project_path).unwrap();

        assert_eq!(loaded.embeddings.backend, EmbeddingBackend::Hash);
        assert_eq!(loaded.dialogue.followup_bound(), Some(1));
    }

    #[test]
    fn test_load_missing_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load(tmp.path()).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn test_load_partial_config() {
        let tmp = TempDir::new().unwrap();
        let config_path = paths::config_path(tmp.path());
        fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        fs::write(&config_path, "[dialogue]\nunbounded = true\n").unwrap();

        let config = load(tmp.path()).unwrap();
        assert_eq!(config.dialogue.followup_bound(), None);
        // Other sections should have defaults
        assert_eq!(config.embeddings.model, "all-minilm-l6-v2");
    }

    #[test]
    fn test_zero_bound_is_not_unbounded() {
        let section: DialogueSection = toml::from_str("max_followups = 0").unwrap();
        assert_eq!(section.followup_bound(), Some(0));
    }

    #[test]
    fn test_serve_session_limits() {
        let section: ServeSection = toml::from_str("session_ttl_secs = 60\nmax_sessions = 4").unwrap();
        assert_eq!(section.session_ttl_secs, 60);
        assert_eq!(section.max_sessions, 4);
        assert_eq!(section.port, 50052);
    }

    #[test]
    fn test_is_project() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_project(tmp.path()));

        fs::create_dir_all(paths::project_dir(tmp.path())).unwrap();
        assert!(is_project(tmp.path()));
    }
}
