//! Splits the oracle's plain-text reply into study-plan sections.
//!
//! The reply is expected to look like:
//!
//! ```text
//! STUDY_PLAN:
//! ...
//! FLASHCARDS:
//! Q: ... | A: ...
//! PRACTICE:
//! ...
//! MOTIVATION:
//! ...
//! ```
//!
//! Nothing here fails: a missing `FLASHCARDS:` marker, missing later markers,
//! or junk flashcard lines all degrade to a partial result, and any internal
//! fault falls back to the raw reply in `study_plan`.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{error, info, instrument, warn};

use crate::domain::{Flashcard, StudyPlanResult};

pub const STUDY_PLAN_MARKER: &str = "STUDY_PLAN:";
pub const FLASHCARDS_MARKER: &str = "FLASHCARDS:";
pub const PRACTICE_MARKER: &str = "PRACTICE:";
pub const MOTIVATION_MARKER: &str = "MOTIVATION:";

/// Accepted question/answer delimiters. The earliest match in a line wins.
const ANSWER_DELIMITERS: [&str; 2] = ["| A:", "|A:"];

/// Split a raw reply into sections. Never fails; see module docs for the fallback rules.
#[instrument(level = "debug", skip(raw), fields(raw_len = raw.len()))]
pub fn split_response(raw: &str) -> StudyPlanResult {
  contained(raw, split_sections)
}

/// Run `split`, turning any panic into the raw-reply fallback.
fn contained(raw: &str, split: impl FnOnce(&str) -> StudyPlanResult) -> StudyPlanResult {
  match catch_unwind(AssertUnwindSafe(|| split(raw))) {
    Ok(result) => result,
    Err(_) => {
      error!(target: "study_plan", raw_len = raw.len(), "Section split faulted; serving raw reply");
      StudyPlanResult::raw(raw)
    }
  }
}

fn split_sections(raw: &str) -> StudyPlanResult {
  let Some((head, tail)) = raw.split_once(FLASHCARDS_MARKER) else {
    info!(target: "study_plan", "No FLASHCARDS marker in reply; serving study plan only");
    return StudyPlanResult::raw(strip_marker(raw, STUDY_PLAN_MARKER));
  };

  let mut result = StudyPlanResult::raw(strip_marker(head, STUDY_PLAN_MARKER));

  let (card_block, remainder) = match tail.split_once(PRACTICE_MARKER) {
    Some((cards, rest)) => (cards, Some(rest)),
    None => (tail, None),
  };

  result.flashcards = parse_flashcards(card_block);
  if result.flashcards.is_empty() {
    warn!(target: "study_plan", block_len = card_block.len(), "FLASHCARDS marker present but no flashcards parsed; check the prompt template");
  }

  if let Some(remainder) = remainder {
    match remainder.split_once(MOTIVATION_MARKER) {
      Some((practice, motivation)) => {
        result.practice = practice.trim().to_string();
        result.motivation = motivation.trim().to_string();
      }
      None => result.practice = remainder.trim().to_string(),
    }
  }

  result
}

/// Trim, drop a leading `marker`, trim again.
fn strip_marker(text: &str, marker: &str) -> String {
  let text = text.trim();
  text.strip_prefix(marker).unwrap_or(text).trim().to_string()
}

/// Parse `Q: ... | A: ...` lines, keeping source order. Other lines are dropped.
pub fn parse_flashcards(block: &str) -> Vec<Flashcard> {
  block.lines().filter_map(parse_flashcard_line).collect()
}

fn parse_flashcard_line(line: &str) -> Option<Flashcard> {
  let line = line.trim();
  if line.is_empty() {
    return None;
  }

  let (at, delimiter) = ANSWER_DELIMITERS
    .iter()
    .filter_map(|d| line.find(d).map(|at| (at, *d)))
    .min_by_key(|(at, _)| *at)?;

  let question = line[..at].trim();
  let question = question.strip_prefix("Q:").unwrap_or(question).trim();
  // The delimiter already consumed "A:"; a second one is model noise.
  let answer = line[at + delimiter.len()..].trim();
  let answer = answer.strip_prefix("A:").unwrap_or(answer).trim();

  if question.is_empty() || answer.is_empty() {
    return None;
  }
  Some(Flashcard { question: question.to_string(), answer: answer.to_string() })
}
