//! Home Evaluation Engine
//!
//! Catalogue candidate homes, walk a structured inspection checklist, and
//! derive one comparable score per property:
//! - Fixed inspection catalogue with typed answers
//! - Overall rating and completion scoring
//! - Bounded compare selection
//! - Optimistic mutations with rollback against a record store

pub mod config;
pub mod error;
pub mod evaluation;
pub mod property;
pub mod store;

// Re-exports for convenience
pub use config::HomescoreConfig;
pub use error::{EvalError, EvalResult};
pub use evaluation::{AnswerSet, AnswerValue, EvaluationSchema, ScoreAggregator};
pub use property::{MutationCoordinator, NewProperty, PropertyPatch, PropertyRecord, SelectionGuard};
pub use store::{RecordStore, SqliteRecordStore, StoreError, WorkspaceDirectory};
