//! Domain models: the study request, flashcards, and the split study plan.

use serde::{Deserialize, Serialize};

/// What the caller asks for. `days` stays signed so odd values are rendered, not rejected.
#[derive(Clone, Debug, Deserialize)]
pub struct StudyRequest {
  pub topic: String,
  pub days: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
  pub question: String,
  pub answer: String,
}

/// Sections extracted from the oracle's reply.
/// `study_plan` always carries something (the raw reply on any anomaly); the rest default to empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StudyPlanResult {
  pub study_plan: String,
  pub flashcards: Vec<Flashcard>,
  pub practice: String,
  pub motivation: String,
}

impl StudyPlanResult {
  /// Degraded result: everything goes into `study_plan`.
  pub fn raw(study_plan: impl Into<String>) -> Self {
    Self { study_plan: study_plan.into(), ..Self::default() }
  }
}
