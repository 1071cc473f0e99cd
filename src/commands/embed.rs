//! `symptom-rag embed` - (re)generate symptom embeddings

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::time::Instant;

use symptom_rag::embeddings;

use super::Project;

pub fn execute(root: &Path) -> Result<()> {
    let project = Project::load(root)?;
    let mut store = project.open_store()?;
    let mut embedder = project.create_embedder()?;

    println!(
        "Embedding symptoms with {} ({} dims)...",
        embedder.model_name().bold(),
        embedder.dimension()
    );
    let start = Instant::now();
    let report = embeddings::generate_symptom_embeddings(&mut store, embedder.as_mut())?;

    println!(
        "{} Embedded {} symptoms in {:.1}s",
        "✓".green(),
        report.symptom_count,
        start.elapsed().as_secs_f32()
    );
    Ok(())
}
