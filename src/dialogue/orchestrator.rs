//! Dialogue orchestrator
//!
//! One instance per conversation. Each `advance` runs the diagnostic agent,
//! logs the exchange, then either asks a follow-up (while under the bound)
//! or finishes with diagnosis, recommendation and explanation.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::turn::{
    AgentTag, AskFollowup, Complete, DialoguePhase, DialogueState, Turn, TurnResult,
};
use crate::agents::{
    diagnosis_text, DiagnosticAgent, Explainer, LookupExplainer, LookupRecommender, Profile,
    Recommender, EXPLANATION_APOLOGY, RECOMMENDATION_APOLOGY,
};
use crate::retrieval::{RetrievalError, Retriever};

/// The collaborators a conversation runs on
#[derive(Clone)]
pub struct AgentSet {
    pub diagnostic: DiagnosticAgent,
    pub recommender: Arc<dyn Recommender>,
    pub explainer: Arc<dyn Explainer>,
}

impl AgentSet {
    /// Diagnostic agent over `retriever` with the lookup-table collaborators
    pub fn new(retriever: Arc<Retriever>) -> Self {
        Self {
            diagnostic: DiagnosticAgent::new(retriever),
            recommender: Arc::new(LookupRecommender),
            explainer: Arc::new(LookupExplainer),
        }
    }

    pub fn with_recommender(mut self, recommender: Arc<dyn Recommender>) -> Self {
        self.recommender = recommender;
        self
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = explainer;
        self
    }
}

/// Turn-bounded state machine for one conversation
pub struct Orchestrator {
    agents: AgentSet,
    /// `None` means unbounded
    max_followups: Option<usize>,
    state: DialogueState,
}

impl Orchestrator {
    pub fn new(agents: AgentSet, max_followups: Option<usize>) -> Self {
        Self {
            agents,
            max_followups,
            state: DialogueState::default(),
        }
    }

    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    pub fn max_followups(&self) -> Option<usize> {
        self.max_followups
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete
    }

    fn followups_allowed(&self) -> bool {
        self.max_followups
            .map_or(true, |max| self.state.followup_count < max)
    }

    /// Process one user turn
    ///
    /// A non-empty `profile` replaces the stored one. Every call appends to
    /// the turn log; the follow-up count only moves when a question is asked.
    /// Retrieval failures propagate; collaborator failures become apology
    /// text.
    pub fn advance(
        &mut self,
        user_text: &str,
        profile: Option<Profile>,
    ) -> Result<TurnResult, RetrievalError> {
        if let Some(profile) = profile.filter(|p| !p.is_empty()) {
            self.state.profile = profile;
        }
        if self.state.is_complete {
            warn!("Advancing a dialogue that already completed");
        }
        self.state.phase = DialoguePhase::AwaitingInput;

        let outcome = self.agents.diagnostic.next(
            user_text,
            self.state.followup_count,
            self.max_followups,
        )?;
        self.state
            .turn_log
            .push(Turn::new(user_text, outcome.response()));
        self.state.last_context = outcome.context().cloned();

        if outcome.needs_follow_up() && self.followups_allowed() {
            self.state.followup_count += 1;
            self.state.phase = DialoguePhase::AskFollowup;
            debug!(
                followup_count = self.state.followup_count,
                max_followups = ?self.max_followups,
                "Asking follow-up"
            );
            return Ok(TurnResult::AskFollowup(AskFollowup {
                agent: AgentTag::Diagnostic,
                response: outcome.response(),
                context: self.state.last_context.clone(),
                followup_count: self.state.followup_count,
                max_followups: self.max_followups,
            }));
        }

        let mut forced_diagnosis = false;
        let diagnosis = match (outcome.needs_follow_up(), self.max_followups) {
            (true, Some(max)) => {
                // Bound reached: re-query past the bound to get a summary
                self.state.phase = DialoguePhase::ForceSummary;
                info!(max_followups = max, "Follow-up bound reached; forcing diagnosis");
                let summary = self.agents.diagnostic.next(user_text, max + 1, Some(max))?;
                self.state.last_context = summary.into_context();
                forced_diagnosis = true;
                diagnosis_text(self.state.last_context.as_ref())
            }
            (true, None) => String::new(),
            (false, _) => outcome.response(),
        };

        let context = self.state.last_context.as_ref();
        let recommendation = match self
            .agents
            .recommender
            .recommend(context, &self.state.profile)
        {
            Ok(response) => response.text,
            Err(e) => {
                error!(agent = self.agents.recommender.name(), error = %e, "Recommendation failed");
                RECOMMENDATION_APOLOGY.to_string()
            }
        };
        let explanation = match self.agents.explainer.explain(
            context,
            &recommendation,
            &self.state.profile,
        ) {
            Ok(response) => response.text,
            Err(e) => {
                error!(agent = self.agents.explainer.name(), error = %e, "Explanation failed");
                EXPLANATION_APOLOGY.to_string()
            }
        };

        self.state.is_complete = true;
        self.state.phase = DialoguePhase::Complete;
        info!(
            followup_count = self.state.followup_count,
            forced_diagnosis, "Dialogue complete"
        );

        Ok(TurnResult::Complete(Complete {
            agent: AgentTag::Orchestrator,
            diagnosis,
            recommendation,
            explanation,
            context: self.state.last_context.clone(),
            followup_count: self.state.followup_count,
            max_followups: self.max_followups,
            forced_diagnosis,
        }))
    }
}
