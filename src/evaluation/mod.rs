//! Evaluation Module
//!
//! The inspection checklist catalogue, typed answers, and the scoring that
//! turns answers into a rating and a completion percentage.

pub mod answer;
pub mod schema;
pub mod score;

pub use answer::{AnswerSet, AnswerValue, BoolOrText, ItemNotes, RatingTier, NOTE_MAX_CHARS};
pub use schema::{EvaluationCategory, EvaluationItem, EvaluationSchema, ItemKind};
pub use score::{CategoryProgress, EvaluationStatus, EvaluationSummary, ScoreAggregator};
