//! Prompt rendering for study-plan generation.
//!
//! The reply format requested here is what `splitter` parses, so the section
//! headers below must stay in sync with its markers.

use crate::splitter::{FLASHCARDS_MARKER, MOTIVATION_MARKER, PRACTICE_MARKER, STUDY_PLAN_MARKER};
use crate::util::fill_template;

pub const FLASHCARD_COUNT: usize = 15;
pub const PRACTICE_COUNT: usize = 5;

const STUDY_PLAN_TEMPLATE: &str = r#"Create a study plan for "{topic}" across {days} days.

Follow THIS EXACT format with the four section headers below, in this order, and nothing else (no markdown, no extra headings):

{study_plan_marker}
[A {days}-day roadmap covering exactly {days} days, with Pomodoro sessions (25/5), spaced repetition checkpoints, daily goals, and practical tips.]

{flashcards_marker}
[Exactly {flashcard_count} flashcards, one per line, each formatted as: Q: <question> | A: <answer>. Keep them short but thought-provoking.]

{practice_marker}
[Exactly {practice_count} practice questions, each followed by a full, detailed answer. They should test real understanding.]

{motivation_marker}
[Exactly one honest, funny quote about mastering {topic} or the grind of studying.]"#;

/// Render the instruction sent to the oracle. Pure; any `days` value is rendered literally.
pub fn build_study_prompt(topic: &str, days: i64) -> String {
  let days = days.to_string();
  let flashcard_count = FLASHCARD_COUNT.to_string();
  let practice_count = PRACTICE_COUNT.to_string();
  // Markers first so a topic containing "{days}" is not expanded twice.
  let skeleton = fill_template(
    STUDY_PLAN_TEMPLATE,
    &[
      ("study_plan_marker", STUDY_PLAN_MARKER),
      ("flashcards_marker", FLASHCARDS_MARKER),
      ("practice_marker", PRACTICE_MARKER),
      ("motivation_marker", MOTIVATION_MARKER),
      ("flashcard_count", &flashcard_count),
      ("practice_count", &practice_count),
      ("days", &days),
    ],
  );
  fill_template(&skeleton, &[("topic", topic)])
}
