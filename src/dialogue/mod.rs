//! Dialogue module - turn-bounded diagnostic conversations
//!
//! Public interface:
//! - `Orchestrator` one conversation: diagnostic step, follow-up bound,
//!   forced summary, recommendation and explanation
//! - `TurnResult` the tagged per-turn response (`ask_followup` | `complete`)
//! - `SessionStore` concurrent map of session id → orchestrator
//!
//! ```text
//! AwaitingInput ──follow-up needed, under bound──▶ AskFollowup ──▶ AwaitingInput
//!       │
//!       ├──follow-up needed, bound reached──▶ ForceSummary ──▶ Complete
//!       └──diagnosis or no match──────────────────────────────▶ Complete
//! ```

mod orchestrator;
mod session;
mod turn;

pub use orchestrator::{AgentSet, Orchestrator};
pub use session::{SessionError, SessionLimits, SessionSnapshot, SessionStore};
pub use turn::{
    AgentTag, AskFollowup, Complete, DialoguePhase, DialogueState, Turn, TurnResult,
};
