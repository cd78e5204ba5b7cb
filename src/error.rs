//! Error types per layer, and their mapping to HTTP responses.
//!
//! Only generic messages reach the caller; provider diagnostics stay in the log.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;
use tracing::error;

use crate::protocol::ErrorOut;

/// Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("{0} is not set; the study plan generator needs an API key")]
  MissingCredential(&'static str),
  #[error("failed to build HTTP client: {0}")]
  HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum OracleError {
  /// Transport failure, timeout, or non-success status.
  #[error("oracle unavailable: {0}")]
  Unavailable(String),
  /// Success status but the payload is not what we expect.
  #[error("oracle reply malformed: {0}")]
  MalformedReply(String),
}

#[derive(Debug, Error)]
pub enum DeckError {
  #[error("sqlite: {0}")]
  Sqlite(#[from] rusqlite::Error),
  #[error("zip: {0}")]
  Zip(#[from] zip::result::ZipError),
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("json: {0}")]
  Json(#[from] serde_json::Error),
  #[error("deck build task failed: {0}")]
  Task(String),
}

/// What a handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Oracle(#[from] OracleError),
  #[error(transparent)]
  Deck(#[from] DeckError),
}

impl ApiError {
  fn detail(&self) -> &'static str {
    match self {
      ApiError::Oracle(OracleError::Unavailable(_)) => "Study plan generator is unavailable. Try again?",
      ApiError::Oracle(OracleError::MalformedReply(_)) => "Study plan generator returned an unreadable reply.",
      ApiError::Deck(_) => "Failed to build the flashcard deck.",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    error!(target: "learnflow", error = %self, "Request failed");
    let body = ErrorOut { detail: self.detail().to_string() };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
  }
}
