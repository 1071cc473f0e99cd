//! symptom-rag: semantic symptom retrieval and turn-bounded diagnostic dialogue
//!
//! Leaf-first layout:
//! - `db` / `knowledge`: SQLite knowledge store, CSV ingestion
//! - `embeddings`: embedding engines and embedding generation
//! - `retrieval`: in-memory index and the query-time retriever
//! - `agents`: diagnostic agent plus recommendation/explanation collaborators
//! - `dialogue`: per-session orchestrator and the session store
//! - `project` / `paths`: configuration and filesystem layout

pub mod agents;
pub mod db;
pub mod dialogue;
pub mod embeddings;
pub mod knowledge;
pub mod paths;
pub mod project;
pub mod retrieval;

// Re-export commonly used types
pub use dialogue::{Orchestrator, SessionStore, TurnResult};
pub use knowledge::KnowledgeStore;
pub use retrieval::{RetrievalResult, Retriever};
