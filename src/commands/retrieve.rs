//! `symptom-rag retrieve` - one-shot semantic search

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::Project;

pub fn execute(root: &Path, query: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    let project = Project::load(root)?;
    let retriever = project.load_retriever()?;
    let top_k = top_k.unwrap_or(project.config.retrieval.top_k);

    let results = retriever.retrieve(query, top_k)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matching symptoms (index holds {}).", retriever.len());
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!(
            "{}. {} {}",
            rank + 1,
            result.symptom.bold(),
            format!("(score {:.3})", result.score).dimmed()
        );
        if !result.conditions.is_empty() {
            println!("   Conditions: {}", result.conditions.join(", "));
        }
        if !result.questions.is_empty() {
            println!("   Follow-up questions: {}", result.questions.join("; "));
        }
    }
    Ok(())
}
