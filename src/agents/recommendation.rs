//! Recommendation collaborator

use tracing::{info, warn};

use super::{CollaboratorError, ConditionKey, Context, Profile, Response};

/// Apology used when a recommender fails
pub const RECOMMENDATION_APOLOGY: &str =
    "Sorry, an internal error occurred while generating a recommendation.";

/// Produces advice for the final dialogue context
pub trait Recommender: Send + Sync {
    /// Collaborator name for logs
    fn name(&self) -> &'static str {
        "recommendation"
    }

    fn recommend(
        &self,
        context: Option<&Context>,
        profile: &Profile,
    ) -> Result<Response, CollaboratorError>;
}

/// Fixed advice keyed on the top condition
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupRecommender;

impl Recommender for LookupRecommender {
    fn recommend(
        &self,
        context: Option<&Context>,
        _profile: &Profile,
    ) -> Result<Response, CollaboratorError> {
        let text = match ConditionKey::classify(context) {
            ConditionKey::Missing => {
                warn!("No conditions in context; returning generic recommendation");
                "No specific recommendation available."
            }
            ConditionKey::Strep => {
                info!("Strep condition detected");
                "This might be related to strep throat. Try resting, stay hydrated, and monitor your symptoms. If they worsen, consult a healthcare provider."
            }
            ConditionKey::Migraine => {
                info!("Migraine condition detected");
                "For migraines, rest in a dark room and consider over-the-counter pain relief. If severe, consult a doctor."
            }
            ConditionKey::General => {
                info!("General condition; returning default recommendation");
                "Please follow general health advice and consult a medical professional if symptoms persist."
            }
        };
        Ok(Response::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(condition: &str) -> Context {
        Context {
            symptom_id: 1,
            symptom: "symptom".to_string(),
            score: 1.0,
            conditions: vec![condition.to_string()],
            questions: Vec::new(),
        }
    }

    #[test]
    fn test_lookup_branches() {
        let r = LookupRecommender;
        let profile = Profile::new();

        let strep = r.recommend(Some(&context("strep throat")), &profile).unwrap();
        assert!(strep.text.starts_with("This might be related to strep throat"));

        let migraine = r.recommend(Some(&context("migraine")), &profile).unwrap();
        assert!(migraine.text.starts_with("For migraines"));

        let other = r.recommend(Some(&context("influenza")), &profile).unwrap();
        assert!(other.text.starts_with("Please follow general health advice"));

        let none = r.recommend(None, &profile).unwrap();
        assert_eq!(none.text, "No specific recommendation available.");
    }
}
