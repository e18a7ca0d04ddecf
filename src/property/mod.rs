//! Property Module
//!
//! Property records, the compare-selection limit, and the coordinator that
//! keeps the local collection consistent with the record store.

pub mod coordinator;
pub mod record;
pub mod selection;

pub use coordinator::MutationCoordinator;
pub use record::{normalize_address, NewProperty, OfferIntent, PropertyDraft, PropertyPatch, PropertyRecord};
pub use selection::{SelectionGuard, COMPARE_LIMIT};

pub use crate::evaluation::EvaluationStatus;
