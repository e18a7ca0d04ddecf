//! Compare selection guard

use crate::error::{EvalError, EvalResult};

/// Maximum number of properties marked for side-by-side comparison
pub const COMPARE_LIMIT: usize = 3;

/// Decides compare toggles from counts supplied by the caller.
///
/// Holds no state of its own; the caller sources the current selection
/// count from the authoritative collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionGuard {
    limit: usize,
}

impl SelectionGuard {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the new selected state, or `SelectionLimitExceeded` when
    /// selecting would go past the limit. Unselecting always succeeds.
    pub fn toggle_compare(&self, current_selection_count: usize, is_currently_selected: bool) -> EvalResult<bool> {
        if is_currently_selected {
            return Ok(false);
        }
        if current_selection_count >= self.limit {
            return Err(EvalError::SelectionLimitExceeded { limit: self.limit });
        }
        Ok(true)
    }
}

impl Default for SelectionGuard {
    fn default() -> Self {
        Self::new(COMPARE_LIMIT)
    }
}
