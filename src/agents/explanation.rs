//! Explanation collaborator

use tracing::{info, warn};

use super::{CollaboratorError, ConditionKey, Context, Profile, Response};

/// Apology used when an explainer fails
pub const EXPLANATION_APOLOGY: &str =
    "Sorry, an internal error occurred while generating an explanation.";

/// Explains the diagnosis and the recommendation given for it
pub trait Explainer: Send + Sync {
    /// Collaborator name for logs
    fn name(&self) -> &'static str {
        "explanation"
    }

    fn explain(
        &self,
        context: Option<&Context>,
        recommendation: &str,
        profile: &Profile,
    ) -> Result<Response, CollaboratorError>;
}

/// Fixed rationale keyed on the top condition
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupExplainer;

impl Explainer for LookupExplainer {
    fn explain(
        &self,
        context: Option<&Context>,
        _recommendation: &str,
        _profile: &Profile,
    ) -> Result<Response, CollaboratorError> {
        let text = match ConditionKey::classify(context) {
            ConditionKey::Missing => {
                warn!("No conditions in context; returning generic explanation");
                "No explanation available."
            }
            ConditionKey::Strep => {
                info!("Strep condition detected");
                "This diagnosis is based on your symptom pattern, which aligns with typical cases of strep throat. Further tests or follow-up may refine the diagnosis."
            }
            ConditionKey::Migraine => {
                info!("Migraine condition detected");
                "Migraine diagnosis is suggested by your history of headaches and sensitivity to light."
            }
            ConditionKey::General => {
                info!("General condition; returning default explanation");
                "The explanation is based on the provided symptoms and medical knowledge."
            }
        };
        Ok(Response::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_context() {
        let text = LookupExplainer
            .explain(None, "", &Profile::new())
            .unwrap()
            .text;
        assert_eq!(text, "No explanation available.");
    }

    #[test]
    fn test_migraine() {
        let context = Context {
            symptom_id: 3,
            symptom: "headache".to_string(),
            score: 0.8,
            conditions: vec!["Migraine".to_string()],
            questions: Vec::new(),
        };
        let text = LookupExplainer
            .explain(Some(&context), "rest", &Profile::new())
            .unwrap()
            .text;
        assert!(text.starts_with("Migraine diagnosis"));
    }
}
