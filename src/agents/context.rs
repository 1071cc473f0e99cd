//! Context carried between dialogue turns

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::retrieval::RetrievalResult;

/// Free-form user attributes (age, gender, known conditions, ...)
pub type Profile = BTreeMap<String, serde_json::Value>;

/// The most recent retrieval hit driving the dialogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub symptom_id: i64,
    pub symptom: String,
    pub score: f32,
    pub conditions: Vec<String>,
    pub questions: Vec<String>,
}

impl Context {
    /// First linked condition, if any
    pub fn top_condition(&self) -> Option<&str> {
        self.conditions.first().map(String::as_str)
    }

    /// Conditions joined for display, "Unknown" when there are none
    pub fn conditions_summary(&self) -> String {
        if self.conditions.is_empty() {
            "Unknown".to_string()
        } else {
            self.conditions.join(", ")
        }
    }
}

impl From<RetrievalResult> for Context {
    fn from(result: RetrievalResult) -> Self {
        Self {
            symptom_id: result.symptom_id,
            symptom: result.symptom,
            score: result.score,
            conditions: result.conditions,
            questions: result.questions,
        }
    }
}
