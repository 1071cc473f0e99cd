//! Diagnostic agent
//!
//! Retrieves the single best-matching symptom for the user's text and
//! decides whether to ask one of its follow-up questions or to summarize
//! its conditions.

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::Context;
use crate::retrieval::{RetrievalError, Retriever};

/// Reply when retrieval finds nothing
pub const NO_MATCH_RESPONSE: &str =
    "Sorry, I couldn't find relevant information for your symptoms.";

/// What the diagnostic agent decided for one input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticOutcome {
    /// Ask a clarifying question drawn from the matched symptom
    FollowUp { question: String, context: Context },
    /// Summarize the matched symptom's conditions
    Diagnosis { context: Context },
    /// Nothing in the index matched
    NoMatch,
}

impl DiagnosticOutcome {
    /// User-facing text for this outcome
    pub fn response(&self) -> String {
        match self {
            Self::FollowUp { question, .. } => format!("Follow-up: {}", question),
            Self::Diagnosis { context } => diagnosis_text(Some(context)),
            Self::NoMatch => NO_MATCH_RESPONSE.to_string(),
        }
    }

    pub fn context(&self) -> Option<&Context> {
        match self {
            Self::FollowUp { context, .. } | Self::Diagnosis { context } => Some(context),
            Self::NoMatch => None,
        }
    }

    pub fn into_context(self) -> Option<Context> {
        match self {
            Self::FollowUp { context, .. } | Self::Diagnosis { context } => Some(context),
            Self::NoMatch => None,
        }
    }

    pub fn needs_follow_up(&self) -> bool {
        matches!(self, Self::FollowUp { .. })
    }
}

/// "Based on your symptoms, possible conditions: ..." for a context
pub fn diagnosis_text(context: Option<&Context>) -> String {
    let conditions = context
        .map(Context::conditions_summary)
        .unwrap_or_else(|| "Unknown".to_string());
    format!("Based on your symptoms, possible conditions: {}", conditions)
}

/// Top-1 retrieval plus the follow-up/diagnosis decision
#[derive(Clone)]
pub struct DiagnosticAgent {
    retriever: Arc<Retriever>,
}

impl DiagnosticAgent {
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self { retriever }
    }

    /// Decide the next diagnostic step for `user_text`
    ///
    /// A follow-up is offered when the matched symptom has questions and
    /// `followup_count` has not passed `max_followups` (`None` is
    /// unbounded). At the bound itself the agent still asks; the
    /// orchestrator owns the bound and forces the summary by calling again
    /// with a count past it.
    ///
    /// The question is picked by `followup_count` modulo the number of
    /// questions, so past the end of the list the rotation starts over
    /// (count 3 of two questions asks the second one). An exhausted list
    /// does not fall back to repeating the first question.
    pub fn next(
        &self,
        user_text: &str,
        followup_count: usize,
        max_followups: Option<usize>,
    ) -> Result<DiagnosticOutcome, RetrievalError> {
        let Some(top) = self.retriever.retrieve(user_text, 1)?.into_iter().next() else {
            debug!("No symptom matched");
            return Ok(DiagnosticOutcome::NoMatch);
        };
        let context = Context::from(top);

        let allowed = max_followups.map_or(true, |max| followup_count <= max);
        if allowed && !context.questions.is_empty() {
            let question = context.questions[followup_count % context.questions.len()].clone();
            debug!(symptom = %context.symptom, followup_count, "Asking follow-up");
            return Ok(DiagnosticOutcome::FollowUp { question, context });
        }

        debug!(symptom = %context.symptom, "Summarizing conditions");
        Ok(DiagnosticOutcome::Diagnosis { context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbeddingEngine, HashEmbedder};
    use crate::knowledge::SymptomRecord;
    use crate::retrieval::EmbeddingIndex;

    fn agent(records: Vec<SymptomRecord>) -> DiagnosticAgent {
        let mut embedder = HashEmbedder::new(64);
        let vectors = records
            .iter()
            .map(|r| embedder.embed_passage(&r.text).unwrap())
            .collect();
        let ids = records.iter().map(|r| r.id).collect();
        let index = EmbeddingIndex::from_parts(vectors, ids).unwrap();
        let retriever = Retriever::new(index, records, Box::new(embedder)).unwrap();
        DiagnosticAgent::new(Arc::new(retriever))
    }

    fn headache() -> SymptomRecord {
        SymptomRecord {
            id: 1,
            text: "headache".to_string(),
            conditions: vec!["migraine".to_string()],
            questions: vec![
                "Do you have nausea?".to_string(),
                "Is light painful?".to_string(),
            ],
        }
    }

    #[test]
    fn test_follow_up_when_allowed() {
        let outcome = agent(vec![headache()]).next("headache", 0, Some(2)).unwrap();
        assert!(outcome.needs_follow_up());
        assert_eq!(outcome.response(), "Follow-up: Do you have nausea?");
    }

    #[test]
    fn test_questions_cycle_by_count() {
        let agent = agent(vec![headache()]);
        let second = agent.next("headache", 1, None).unwrap();
        let third = agent.next("headache", 2, None).unwrap();
        assert_eq!(second.response(), "Follow-up: Is light painful?");
        assert_eq!(third.response(), "Follow-up: Do you have nausea?");

        let fourth = agent.next("headache", 3, None).unwrap();
        assert_eq!(fourth.response(), "Follow-up: Is light painful?");
    }

    #[test]
    fn test_diagnosis_past_bound() {
        let agent = agent(vec![headache()]);
        assert!(agent.next("headache", 1, Some(1)).unwrap().needs_follow_up());

        let outcome = agent.next("headache", 2, Some(1)).unwrap();
        assert!(!outcome.needs_follow_up());
        assert_eq!(
            outcome.response(),
            "Based on your symptoms, possible conditions: migraine"
        );
    }

    #[test]
    fn test_diagnosis_without_questions() {
        let mut record = headache();
        record.questions.clear();
        let outcome = agent(vec![record]).next("headache", 0, None).unwrap();
        assert!(matches!(outcome, DiagnosticOutcome::Diagnosis { .. }));
    }

    #[test]
    fn test_no_match_on_empty_index() {
        let outcome = agent(Vec::new()).next("headache", 0, None).unwrap();
        assert_eq!(outcome, DiagnosticOutcome::NoMatch);
        assert_eq!(outcome.response(), NO_MATCH_RESPONSE);
        assert!(outcome.context().is_none());
    }

    #[test]
    fn test_diagnosis_text_unknown() {
        assert_eq!(
            diagnosis_text(None),
            "Based on your symptoms, possible conditions: Unknown"
        );
    }
}
