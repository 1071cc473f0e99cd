//! Integration tests for the turn-bounded dialogue

use anyhow::{bail, Result};
use std::sync::Arc;

use symptom_rag::agents::{
    CollaboratorError, Context, Profile, Recommender, Response, NO_MATCH_RESPONSE,
    RECOMMENDATION_APOLOGY,
};
use symptom_rag::dialogue::{AgentSet, Orchestrator, SessionStore, TurnResult};
use symptom_rag::embeddings::{EmbeddingEngine, HashEmbedder};
use symptom_rag::knowledge::SymptomRecord;
use symptom_rag::retrieval::{EmbeddingIndex, RetrievalError, Retriever};

const DIM: usize = 128;

/// Build a retriever over `records` with the hashing embedder
fn retriever(records: Vec<SymptomRecord>) -> Arc<Retriever> {
    let mut embedder = HashEmbedder::new(DIM);
    let vectors = records
        .iter()
        .map(|r| embedder.embed_passage(&r.text).unwrap())
        .collect();
    let ids = records.iter().map(|r| r.id).collect();
    let index = EmbeddingIndex::from_parts(vectors, ids).unwrap();
    Arc::new(Retriever::new(index, records, Box::new(embedder)).unwrap())
}

fn headache() -> SymptomRecord {
    SymptomRecord {
        id: 1,
        text: "headache".to_string(),
        conditions: vec!["migraine".to_string()],
        questions: vec!["Do you have nausea?".to_string()],
    }
}

fn orchestrator(records: Vec<SymptomRecord>, max_followups: Option<usize>) -> Orchestrator {
    Orchestrator::new(AgentSet::new(retriever(records)), max_followups)
}

#[test]
fn test_headache_scenario_bound_one() {
    let mut orch = orchestrator(vec![headache()], Some(1));
    let mut profile = Profile::new();
    profile.insert("age".to_string(), 28.into());

    let first = orch
        .advance("I have a severe headache and light sensitivity", Some(profile))
        .unwrap();
    let TurnResult::AskFollowup(ask) = first else {
        panic!("expected a follow-up, got {:?}", first);
    };
    assert_eq!(ask.followup_count, 1);
    assert_eq!(ask.max_followups, Some(1));
    assert_eq!(ask.response, "Follow-up: Do you have nausea?");

    let second = orch.advance("Yes, I also feel nauseous.", None).unwrap();
    let TurnResult::Complete(done) = second else {
        panic!("expected completion, got {:?}", second);
    };
    assert!(done.diagnosis.contains("migraine"));
    assert!(done.forced_diagnosis);
    assert!(done.recommendation.starts_with("For migraines"));
    assert!(done.explanation.starts_with("Migraine diagnosis"));
    assert_eq!(done.followup_count, 1);

    let state = orch.state();
    assert!(state.is_complete);
    assert_eq!(state.turn_log.len(), 2);
    assert_eq!(state.profile["age"], 28);
}

#[test]
fn test_zero_bound_forces_on_first_turn() {
    let mut orch = orchestrator(vec![headache()], Some(0));

    let result = orch.advance("headache", None).unwrap();
    let TurnResult::Complete(done) = result else {
        panic!("expected completion");
    };
    assert!(done.forced_diagnosis);
    assert_eq!(done.followup_count, 0);
    assert_eq!(
        done.diagnosis,
        "Based on your symptoms, possible conditions: migraine"
    );
}

#[test]
fn test_bound_limits_followups() {
    for max in 0..4 {
        let mut orch = orchestrator(vec![headache()], Some(max));
        let mut asks = 0;
        loop {
            let result = orch.advance("headache", None).unwrap();
            if result.is_complete() {
                break;
            }
            asks += 1;
            assert!(asks <= max, "asked more than {} follow-ups", max);
        }
        assert_eq!(asks, max);
        assert!(orch.state().followup_count <= max + 1);
    }
}

#[test]
fn test_unbounded_never_forces() {
    let mut orch = orchestrator(vec![headache()], None);
    for _ in 0..20 {
        let result = orch.advance("headache", None).unwrap();
        assert!(!result.is_complete());
    }
    assert_eq!(orch.state().followup_count, 20);
}

#[test]
fn test_record_without_questions_completes_unforced() {
    let mut record = headache();
    record.questions.clear();
    let mut orch = orchestrator(vec![record], Some(3));

    let TurnResult::Complete(done) = orch.advance("headache", None).unwrap() else {
        panic!("expected completion");
    };
    assert!(!done.forced_diagnosis);
    assert_eq!(
        done.diagnosis,
        "Based on your symptoms, possible conditions: migraine"
    );

    let json = serde_json::to_value(TurnResult::Complete(done)).unwrap();
    assert!(json.get("forced_diagnosis").is_none());
}

#[test]
fn test_empty_index_falls_back() {
    let mut orch = orchestrator(Vec::new(), Some(2));

    let TurnResult::Complete(done) = orch.advance("I have a headache", None).unwrap() else {
        panic!("expected completion");
    };
    assert_eq!(done.diagnosis, NO_MATCH_RESPONSE);
    assert!(done.context.is_none());
    assert_eq!(orch.state().turn_log[0].agent_text, NO_MATCH_RESPONSE);
}

struct FailingRecommender;

impl Recommender for FailingRecommender {
    fn recommend(
        &self,
        _context: Option<&Context>,
        _profile: &Profile,
    ) -> Result<Response, CollaboratorError> {
        Err(CollaboratorError::Failed {
            agent: "recommendation",
            reason: "lookup service unavailable".to_string(),
        })
    }
}

#[test]
fn test_collaborator_failure_becomes_apology() {
    let agents = AgentSet::new(retriever(vec![headache()])).with_recommender(Arc::new(FailingRecommender));
    let mut orch = Orchestrator::new(agents, Some(0));

    let TurnResult::Complete(done) = orch.advance("headache", None).unwrap() else {
        panic!("expected completion");
    };
    assert_eq!(done.recommendation, RECOMMENDATION_APOLOGY);
    assert!(done.explanation.starts_with("Migraine diagnosis"));
    assert!(orch.is_complete());
}

/// Engine whose query encoding always fails
struct BrokenEngine;

impl EmbeddingEngine for BrokenEngine {
    fn embed(&mut self, _text: &str) -> Result<Vec<f32>> {
        bail!("tokenizer exploded")
    }
    fn dimension(&self) -> usize {
        2
    }
    fn model_name(&self) -> &str {
        "broken"
    }
}

#[test]
fn test_encoding_error_propagates() {
    let index = EmbeddingIndex::from_parts(vec![vec![1.0, 0.0]], vec![1]).unwrap();
    let retriever = Retriever::new(index, vec![headache()], Box::new(BrokenEngine)).unwrap();
    let mut orch = Orchestrator::new(AgentSet::new(Arc::new(retriever)), Some(1));

    let err = orch.advance("headache", None).unwrap_err();
    assert!(matches!(err, RetrievalError::Encoding { ref reason } if reason.contains("tokenizer exploded")));
    assert!(orch.state().turn_log.is_empty());
    assert!(!orch.is_complete());
}

#[test]
fn test_sessions_are_independent() {
    let store = SessionStore::new(AgentSet::new(retriever(vec![headache()])), Some(1));
    let a = store.create().unwrap();
    let b = store.create().unwrap();

    store.advance(a, "headache", None).unwrap();
    assert_eq!(store.snapshot(a).unwrap().state.followup_count, 1);
    assert_eq!(store.snapshot(b).unwrap().state.followup_count, 0);

    let done = store.advance(a, "headache", None).unwrap();
    assert!(done.is_complete());
    assert!(!store.snapshot(b).unwrap().state.is_complete);
}

#[test]
fn test_concurrent_sessions() {
    let store = Arc::new(SessionStore::new(
        AgentSet::new(retriever(vec![headache()])),
        Some(2),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                let id = store.create().unwrap();
                let mut turns = 0;
                while !store.advance(id, "headache", None).unwrap().is_complete() {
                    turns += 1;
                }
                turns
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 2);
    }
    assert_eq!(store.len(), 8);
}
