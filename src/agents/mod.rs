//! Agents - the collaborators a dialogue turn is built from
//!
//! - `DiagnosticAgent` retrieves the best-matching symptom and decides
//!   between a follow-up question and a diagnosis summary
//! - `Recommender` / `Explainer` turn the final context into advice and a
//!   rationale; the defaults are lookup tables keyed on the top condition
//!
//! Collaborators are trait objects so a session can swap in other
//! implementations (tests use failing stubs).

mod context;
mod diagnostic;
mod explanation;
mod recommendation;

pub use context::{Context, Profile};
pub use diagnostic::{diagnosis_text, DiagnosticAgent, DiagnosticOutcome, NO_MATCH_RESPONSE};
pub use explanation::{Explainer, LookupExplainer, EXPLANATION_APOLOGY};
pub use recommendation::{LookupRecommender, Recommender, RECOMMENDATION_APOLOGY};

use serde::{Deserialize, Serialize};

/// Text produced by a collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
}

impl Response {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A collaborator failed to produce a response
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{agent} agent failed: {reason}")]
    Failed { agent: &'static str, reason: String },
}

/// Lookup key derived from the top condition in a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConditionKey {
    /// No context, or a context without conditions
    Missing,
    Strep,
    Migraine,
    General,
}

impl ConditionKey {
    pub(crate) fn classify(context: Option<&Context>) -> Self {
        let Some(condition) = context.and_then(Context::top_condition) else {
            return Self::Missing;
        };

        let condition = condition.to_lowercase();
        if condition.contains("strep") {
            Self::Strep
        } else if condition.contains("migraine") {
            Self::Migraine
        } else {
            Self::General
        }
    }
}
