//! Single source of truth for the symptom-rag filesystem layout.
//!
//! This module defines WHERE data lives. It has no I/O, no validation,
//! no business logic.
//!
//! # Project-Level Paths (project/.symptom-rag/)
//!
//! ```text
//! project/.symptom-rag/
//! ├── config.toml              # Project config
//! └── data/                    # Derived (gitignored)
//!     ├── symptoms.db          # Knowledge store (SQLite)
//!     └── serve.token          # Bearer token for `serve` (0600)
//!
//! project/resources/models/    # ONNX model + tokenizer per model name
//! ```

use std::path::{Path, PathBuf};

/// Name of the per-project directory
pub const PROJECT_DIR: &str = ".symptom-rag";

/// Project directory: `{root}/.symptom-rag/`
pub fn project_dir(root: &Path) -> PathBuf {
    root.join(PROJECT_DIR)
}

/// Project config: `{root}/.symptom-rag/config.toml`
pub fn config_path(root: &Path) -> PathBuf {
    project_dir(root).join("config.toml")
}

/// Derived data: `{root}/.symptom-rag/data/`
pub fn data_dir(root: &Path) -> PathBuf {
    project_dir(root).join("data")
}

/// Default knowledge store, relative to the project root
pub fn default_store_path() -> PathBuf {
    PathBuf::from(PROJECT_DIR).join("data").join("symptoms.db")
}

/// Bearer token written by `serve`: `{root}/.symptom-rag/data/serve.token`
pub fn serve_token_path(root: &Path) -> PathBuf {
    data_dir(root).join("serve.token")
}

/// Model files
pub mod models {
    use super::*;

    /// Model directory relative to the project root: `resources/models/{name}/`
    pub fn model_dir(name: &str) -> PathBuf {
        PathBuf::from("resources").join("models").join(name)
    }

    /// Full-precision ONNX graph inside a model directory
    pub fn onnx(dir: &Path) -> PathBuf {
        dir.join("model.onnx")
    }

    /// INT8 quantized ONNX graph inside a model directory (preferred when present)
    pub fn onnx_quantized(dir: &Path) -> PathBuf {
        dir.join("model_quantized.onnx")
    }

    /// HuggingFace tokenizer inside a model directory
    pub fn tokenizer(dir: &Path) -> PathBuf {
        dir.join("tokenizer.json")
    }
}
