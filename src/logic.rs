//! Core behaviors behind the HTTP handlers.
//!
//!   - Generating a study plan: prompt → oracle → section split
//!   - Packaging flashcards into an Anki deck

use tracing::{info, instrument};

use crate::deck::build_apkg;
use crate::domain::{Flashcard, StudyPlanResult, StudyRequest};
use crate::error::{ApiError, DeckError};
use crate::prompt::build_study_prompt;
use crate::splitter::split_response;
use crate::state::AppState;
use crate::util::preview;

/// One oracle call, no retry. Oracle failures propagate; split anomalies never do.
#[instrument(level = "info", skip(state, req), fields(topic = %preview(&req.topic, 40), days = req.days))]
pub async fn generate_study_plan(state: &AppState, req: &StudyRequest) -> Result<StudyPlanResult, ApiError> {
  let prompt = build_study_prompt(&req.topic, req.days);
  let raw = state.oracle.generate_text(&prompt).await?;
  let result = split_response(&raw);
  info!(
    target: "study_plan",
    raw_len = raw.len(),
    plan_len = result.study_plan.len(),
    flashcards = result.flashcards.len(),
    has_practice = !result.practice.is_empty(),
    has_motivation = !result.motivation.is_empty(),
    "Study plan generated"
  );
  Ok(result)
}

/// Build the deck on the blocking pool.
#[instrument(level = "info", skip(state, cards), fields(cards = cards.len()))]
pub async fn export_deck(state: &AppState, cards: Vec<Flashcard>) -> Result<Vec<u8>, ApiError> {
  let deck_name = state.deck_name.clone();
  let bytes = tokio::task::spawn_blocking(move || build_apkg(&deck_name, &cards))
    .await
    .map_err(|e| DeckError::Task(e.to_string()))??;
  Ok(bytes)
}
