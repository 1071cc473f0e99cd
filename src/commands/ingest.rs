//! `symptom-rag ingest` - load a symptom CSV into the knowledge store

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use symptom_rag::knowledge::ingest;

use super::Project;

pub fn execute(root: &Path, csv: &Path, replace: bool) -> Result<()> {
    let project = Project::load(root)?;
    let mut store = project.open_store()?;

    let count = if replace {
        ingest::replace_csv(&mut store, csv)
    } else {
        ingest::ingest_csv(&mut store, csv)
    }
    .with_context(|| format!("Failed to ingest {}", csv.display()))?;
    let stats = store.stats()?;

    println!("{} Ingested {} rows from {}", "✓".green(), count, csv.display());
    println!(
        "  {} symptoms, {} conditions, {} questions",
        stats.symptoms, stats.conditions, stats.questions
    );
    if stats.embeddings < stats.symptoms {
        println!(
            "  {} symptoms have no embedding yet; run {}",
            stats.symptoms - stats.embeddings,
            "symptom-rag embed".bold()
        );
    }
    Ok(())
}
