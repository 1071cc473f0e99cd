//! `symptom-rag serve` - HTTP API over retrieval and dialogue sessions
//!
//! Design: Blocking HTTP microserver (no async/tokio), thread per connection.
//!
//! Endpoints:
//! - `GET /health` (no auth)
//! - `POST /api/retrieve` `{query, top_k?}`
//! - `POST /api/sessions` `{max_followups?, unbounded?}`
//! - `POST /api/sessions/{id}/turn` `{text, profile?}`
//! - `GET /api/sessions/{id}`
//! - `DELETE /api/sessions/{id}`
//!
//! A bearer token is required when `SYMPTOM_RAG_SERVE_TOKEN` is set, and
//! always when binding a non-loopback host (generated if unset).

mod internal;
pub(crate) mod microserver;

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use symptom_rag::dialogue::SessionLimits;

use super::Project;

/// Environment variable holding the bearer token
pub const TOKEN_ENV: &str = "SYMPTOM_RAG_SERVE_TOKEN";

/// Options for the serve command
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub limits: SessionLimits,
}

/// Write the token file readable by the owner only
fn write_token(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        // mode() only applies on creation; tighten a file left by an older run
        if path.exists() {
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(token.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Start the server; CLI flags override `[serve]` from the config
pub fn execute(root: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let project = Project::load(root)?;
    let options = ServeOptions {
        host: host.unwrap_or_else(|| project.config.serve.host.clone()),
        port: port.unwrap_or(project.config.serve.port),
        limits: SessionLimits {
            idle_ttl: Duration::from_secs(project.config.serve.session_ttl_secs),
            max_sessions: project.config.serve.max_sessions,
        },
    };

    let retriever = project.load_retriever()?;
    internal::run_server(
        root,
        &options,
        retriever,
        project.config.dialogue.followup_bound(),
        project.config.retrieval.top_k,
    )
}
