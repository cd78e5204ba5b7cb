//! HTTP request/response DTOs (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! `POST /api/generate` takes a `StudyRequest` and returns a `StudyPlanResult`;
//! `POST /api/download-anki` takes a `Vec<Flashcard>`. Those live in `domain`.

use serde::Serialize;

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub detail: String,
}
