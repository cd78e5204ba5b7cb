//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic result info.

use std::sync::Arc;
use axum::{
  extract::State,
  http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::deck::DECK_FILE_NAME;
use crate::domain::{Flashcard, StudyPlanResult, StudyRequest};
use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(topic_len = body.topic.len(), days = body.days))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<StudyRequest>,
) -> Result<Json<StudyPlanResult>, ApiError> {
  let result = generate_study_plan(&state, &body).await?;
  info!(target: "study_plan", flashcards = result.flashcards.len(), "HTTP study plan served");
  Ok(Json(result))
}

#[instrument(level = "info", skip(state, body), fields(cards = body.len()))]
pub async fn http_post_download_anki(
  State(state): State<Arc<AppState>>,
  Json(body): Json<Vec<Flashcard>>,
) -> Result<impl IntoResponse, ApiError> {
  let bytes = export_deck(&state, body).await?;
  info!(target: "study_plan", bytes = bytes.len(), "HTTP deck served");
  let disposition = format!("attachment; filename=\"{}\"", DECK_FILE_NAME);
  Ok(([(CONTENT_TYPE, "application/apkg".to_string()), (CONTENT_DISPOSITION, disposition)], bytes))
}
