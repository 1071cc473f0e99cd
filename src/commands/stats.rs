//! `symptom-rag stats` - knowledge store summary

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use symptom_rag::knowledge::{EmbeddingMetadata, StoreStats};

use super::Project;

#[derive(Serialize)]
struct StatsReport {
    store: String,
    counts: StoreStats,
    embeddings: Option<EmbeddingMetadata>,
}

pub fn execute(root: &Path, json: bool) -> Result<()> {
    let project = Project::load(root)?;
    let store = project.open_store()?;

    let report = StatsReport {
        store: project.store_path().display().to_string(),
        counts: store.stats()?,
        embeddings: store.embedding_metadata()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Knowledge store: {}", report.store);
    println!("  Symptoms:   {}", report.counts.symptoms);
    println!("  Conditions: {}", report.counts.conditions);
    println!("  Questions:  {}", report.counts.questions);
    println!("  Embeddings: {}", report.counts.embeddings);
    match &report.embeddings {
        Some(meta) => println!(
            "  Model:      {} ({} dims, generated {})",
            meta.model_name, meta.dimension, meta.generated_at
        ),
        None => println!("  Model:      (no embeddings generated)"),
    }
    Ok(())
}
