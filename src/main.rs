use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use symptom_rag::project::EmbeddingBackend;

mod commands;

/// Log filter environment variable (e.g. `SYMPTOM_RAG_LOG=symptom_rag=debug`)
const LOG_ENV: &str = "SYMPTOM_RAG_LOG";

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Semantic symptom retrieval and diagnostic dialogue", long_about = None)]
struct Cli {
    /// Project root (directory containing .symptom-rag/)
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Onnx,
    Hash,
}

impl From<BackendArg> for EmbeddingBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Onnx => EmbeddingBackend::Onnx,
            BackendArg::Hash => EmbeddingBackend::Hash,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize project config and an empty knowledge store
    Init {
        /// Embedding backend to configure
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        /// Rewrite config even if the project exists
        #[arg(long)]
        force: bool,
    },

    /// Ingest a symptom CSV (symptom, conditions, follow_up_questions)
    Ingest {
        /// CSV file to ingest
        csv: PathBuf,

        /// Replace the knowledge store contents (after the CSV parses)
        #[arg(long)]
        replace: bool,
    },

    /// Generate embeddings for every symptom
    Embed,

    /// Retrieve the symptoms most similar to a query
    Retrieve {
        /// Free-text query
        query: String,

        /// Number of results (default: [retrieval] top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Interactive diagnostic dialogue
    Chat {
        /// Follow-up questions before a diagnosis is forced
        #[arg(long, conflicts_with = "unbounded")]
        max_followups: Option<usize>,

        /// Never force a diagnosis
        #[arg(long)]
        unbounded: bool,

        /// Profile: age
        #[arg(long)]
        age: Option<u32>,

        /// Profile: gender
        #[arg(long)]
        gender: Option<String>,

        /// Profile: known condition (repeatable)
        #[arg(long = "condition")]
        conditions: Vec<String>,
    },

    /// Serve the HTTP API
    Serve {
        /// Host to bind (default: [serve] host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (default: [serve] port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show knowledge store statistics
    Stats {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let root = cli.project.as_path();

    match cli.command {
        Commands::Init { backend, force } => {
            commands::init::execute(root, backend.map(Into::into), force)?;
        }
        Commands::Ingest { csv, replace } => {
            commands::ingest::execute(root, &csv, replace)?;
        }
        Commands::Embed => {
            commands::embed::execute(root)?;
        }
        Commands::Retrieve { query, top_k, json } => {
            commands::retrieve::execute(root, &query, top_k, json)?;
        }
        Commands::Chat {
            max_followups,
            unbounded,
            age,
            gender,
            conditions,
        } => {
            let bound = match (max_followups, unbounded) {
                (_, true) => commands::chat::BoundArg::Unbounded,
                (Some(n), false) => commands::chat::BoundArg::Max(n),
                (None, false) => commands::chat::BoundArg::Config,
            };
            let profile = commands::chat::ProfileArgs {
                age,
                gender,
                conditions,
            };
            commands::chat::execute(root, bound, profile)?;
        }
        Commands::Serve { host, port } => {
            commands::serve::execute(root, host, port)?;
        }
        Commands::Stats { json } => {
            commands::stats::execute(root, json)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_chat_bound_flags_conflict() {
        let parsed = Cli::try_parse_from(["symptom-rag", "chat", "--max-followups", "2", "--unbounded"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_project_flag() {
        let cli = Cli::try_parse_from(["symptom-rag", "stats", "-C", "/tmp/p"]).unwrap();
        assert_eq!(cli.project, PathBuf::from("/tmp/p"));
    }
}
