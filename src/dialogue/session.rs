//! Session store
//!
//! Maps session ids to orchestrators. The outer map lock is held only to
//! look up, insert or sweep sessions; each session has its own lock, so
//! turns in different sessions run concurrently while turns in one session
//! serialize.
//!
//! Sessions idle for longer than the TTL are evicted whenever a new session
//! is created. Past that, creation fails once `max_sessions` are live.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use super::{AgentSet, DialogueState, Orchestrator, TurnResult};
use crate::agents::Profile;
use crate::retrieval::RetrievalError;

/// Session lookup and turn errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no session with id {0}")]
    NotFound(Uuid),

    #[error("session limit of {max} reached")]
    Full { max: usize },

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),
}

/// Eviction and capacity settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Sessions untouched for this long are dropped
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(30 * 60),
            max_sessions: 1024,
        }
    }
}

/// Point-in-time copy of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub max_followups: Option<usize>,
    pub state: DialogueState,
}

struct Session {
    orchestrator: Mutex<Orchestrator>,
    last_active: Mutex<Instant>,
}

impl Session {
    fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_active.lock())
    }
}

/// All live conversations
pub struct SessionStore {
    agents: AgentSet,
    default_max_followups: Option<usize>,
    limits: SessionLimits,
    sessions: Mutex<HashMap<Uuid, Arc<Session>>>,
}

impl SessionStore {
    pub fn new(agents: AgentSet, default_max_followups: Option<usize>) -> Self {
        Self {
            agents,
            default_max_followups,
            limits: SessionLimits::default(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn default_max_followups(&self) -> Option<usize> {
        self.default_max_followups
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Start a session with the store's default bound
    pub fn create(&self) -> Result<Uuid, SessionError> {
        self.create_with_bound(self.default_max_followups)
    }

    /// Start a session with its own bound (`None` is unbounded)
    pub fn create_with_bound(&self, max_followups: Option<usize>) -> Result<Uuid, SessionError> {
        let mut sessions = self.sessions.lock();
        let evicted = evict_idle(&mut sessions, self.limits.idle_ttl, Instant::now());
        if evicted > 0 {
            info!(evicted, "Evicted idle sessions");
        }
        if sessions.len() >= self.limits.max_sessions {
            return Err(SessionError::Full {
                max: self.limits.max_sessions,
            });
        }

        let id = Uuid::new_v4();
        let session = Session {
            orchestrator: Mutex::new(Orchestrator::new(self.agents.clone(), max_followups)),
            last_active: Mutex::new(Instant::now()),
        };
        sessions.insert(id, Arc::new(session));
        debug!(session = %id, ?max_followups, "Created session");
        Ok(id)
    }

    fn get(&self, id: Uuid) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .lock()
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound(id))
    }

    /// Advance one session by a user turn
    pub fn advance(
        &self,
        id: Uuid,
        user_text: &str,
        profile: Option<Profile>,
    ) -> Result<TurnResult, SessionError> {
        let session = self.get(id)?;
        let result = session.orchestrator.lock().advance(user_text, profile);
        session.touch();
        Ok(result?)
    }

    pub fn snapshot(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let session = self.get(id)?;
        let orchestrator = session.orchestrator.lock();
        Ok(SessionSnapshot {
            id,
            max_followups: orchestrator.max_followups(),
            state: orchestrator.state().clone(),
        })
    }

    /// Drop a session; returns whether it existed
    pub fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().remove(&id).is_some()
    }

    /// Drop every session idle past the TTL, returning how many went
    pub fn evict_expired(&self) -> usize {
        evict_idle(&mut self.sessions.lock(), self.limits.idle_ttl, Instant::now())
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

fn evict_idle(sessions: &mut HashMap<Uuid, Arc<Session>>, ttl: Duration, now: Instant) -> usize {
    let before = sessions.len();
    sessions.retain(|_, session| session.idle_for(now) < ttl);
    before - sessions.len()
}
