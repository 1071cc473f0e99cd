//! `symptom-rag init` - create project config and an empty knowledge store

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use symptom_rag::project::{self, EmbeddingBackend, ProjectConfig};

use super::Project;

pub fn execute(root: &Path, backend: Option<EmbeddingBackend>, force: bool) -> Result<()> {
    if project::is_project(root) && !force {
        println!(
            "{} already initialized at {} (use --force to rewrite config)",
            "✓".green(),
            symptom_rag::paths::project_dir(root).display()
        );
        return Ok(());
    }

    let mut config = ProjectConfig::default();
    if let Some(backend) = backend {
        config.embeddings.backend = backend;
    }
    project::save(root, &config)?;

    let project = Project::load(root)?;
    let store = project.open_store()?;
    let stats = store.stats()?;

    println!("{} Initialized symptom-rag project", "✓".green());
    println!("  Config: {}", symptom_rag::paths::config_path(root).display());
    println!("  Store:  {}", project.store_path().display());
    println!("  Backend: {:?}", config.embeddings.backend);
    if stats.symptoms == 0 {
        println!(
            "\nNext: {} then {}",
            "symptom-rag ingest <file.csv>".bold(),
            "symptom-rag embed".bold()
        );
    }
    Ok(())
}
