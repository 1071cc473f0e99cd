//! Turn results and dialogue state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{Context, Profile};

/// Which component produced a turn result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentTag {
    Diagnostic,
    Orchestrator,
}

/// A follow-up question for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskFollowup {
    pub agent: AgentTag,
    pub response: String,
    pub context: Option<Context>,
    pub followup_count: usize,
    pub max_followups: Option<usize>,
}

/// Terminal result of a dialogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complete {
    pub agent: AgentTag,
    /// Empty when the last diagnostic step was itself a follow-up prompt
    pub diagnosis: String,
    pub recommendation: String,
    pub explanation: String,
    pub context: Option<Context>,
    pub followup_count: usize,
    pub max_followups: Option<usize>,
    /// Set when the follow-up bound cut the dialogue short
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub forced_diagnosis: bool,
}

/// Result of one `Orchestrator::advance` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "next_action", rename_all = "snake_case")]
pub enum TurnResult {
    AskFollowup(AskFollowup),
    Complete(Complete),
}

impl TurnResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn followup_count(&self) -> usize {
        match self {
            Self::AskFollowup(r) => r.followup_count,
            Self::Complete(r) => r.followup_count,
        }
    }

    pub fn context(&self) -> Option<&Context> {
        match self {
            Self::AskFollowup(r) => r.context.as_ref(),
            Self::Complete(r) => r.context.as_ref(),
        }
    }
}

/// One exchange in the turn log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user_text: String,
    pub agent_text: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(user_text: impl Into<String>, agent_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            agent_text: agent_text.into(),
            at: Utc::now(),
        }
    }
}

/// Where the state machine stopped after the last turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    #[default]
    AwaitingInput,
    AskFollowup,
    ForceSummary,
    Complete,
}

/// Mutable state of one conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueState {
    pub profile: Profile,
    /// Append-only
    pub turn_log: Vec<Turn>,
    pub last_context: Option<Context>,
    /// Only increases, and only when a follow-up is asked
    pub followup_count: usize,
    /// Set once, never reset
    pub is_complete: bool,
    pub phase: DialoguePhase,
}
