//! `symptom-rag chat` - interactive diagnostic dialogue on the terminal

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::Path;

use symptom_rag::agents::Profile;
use symptom_rag::dialogue::{AgentSet, Orchestrator, TurnResult};

use super::Project;

/// Profile fields collected from flags before the first turn
#[derive(Debug, Default)]
pub struct ProfileArgs {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub conditions: Vec<String>,
}

impl ProfileArgs {
    fn into_profile(self) -> Profile {
        let mut profile = Profile::new();
        if let Some(age) = self.age {
            profile.insert("age".to_string(), age.into());
        }
        if let Some(gender) = self.gender {
            profile.insert("gender".to_string(), gender.into());
        }
        if !self.conditions.is_empty() {
            profile.insert("known_conditions".to_string(), self.conditions.into());
        }
        profile
    }
}

/// Follow-up bound requested on the command line
#[derive(Debug, Clone, Copy)]
pub enum BoundArg {
    /// Use `[dialogue]` from the project config
    Config,
    Max(usize),
    Unbounded,
}

pub fn execute(root: &Path, bound: BoundArg, profile: ProfileArgs) -> Result<()> {
    let project = Project::load(root)?;
    let retriever = project.load_retriever()?;

    let max_followups = match bound {
        BoundArg::Config => project.config.dialogue.followup_bound(),
        BoundArg::Max(n) => Some(n),
        BoundArg::Unbounded => None,
    };
    let mut orchestrator = Orchestrator::new(AgentSet::new(retriever), max_followups);
    let mut profile = Some(profile.into_profile());

    println!("{}", "Describe your symptoms (empty line or 'quit' to exit).".bold());
    println!(
        "{}",
        "This is not medical advice. Consult a healthcare provider.".dimmed()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", ">".cyan());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;
        let text = line.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("exit") {
            break;
        }

        match orchestrator.advance(text, profile.take())? {
            TurnResult::AskFollowup(ask) => {
                let bound = ask
                    .max_followups
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "∞".to_string());
                println!(
                    "{} {}",
                    ask.response,
                    format!("[{}/{}]", ask.followup_count, bound).dimmed()
                );
            }
            TurnResult::Complete(done) => {
                if done.forced_diagnosis {
                    println!("{}", "Follow-up limit reached.".yellow());
                }
                if !done.diagnosis.is_empty() {
                    println!("{} {}", "Diagnosis:".bold(), done.diagnosis);
                }
                println!("{} {}", "Recommendation:".bold(), done.recommendation);
                println!("{} {}", "Explanation:".bold(), done.explanation);
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_args_skip_missing_fields() {
        let profile = ProfileArgs {
            age: Some(28),
            gender: None,
            conditions: vec!["migraine".to_string()],
        }
        .into_profile();

        assert_eq!(profile["age"], 28);
        assert!(!profile.contains_key("gender"));
        assert_eq!(profile["known_conditions"], serde_json::json!(["migraine"]));
    }
}
