//! Error taxonomy for evaluation and property mutations

use crate::store::StoreError;

/// Errors surfaced by the evaluation engine and the mutation coordinator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Malformed input, rejected before any store call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A property with the same address already exists for this user
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Selecting one more property would exceed the compare limit
    #[error("You can compare up to {limit} homes")]
    SelectionLimitExceeded { limit: usize },

    /// Record is not known locally or vanished remotely
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Answer does not fit the catalogue item it targets
    #[error("Invalid answer for {category_id}/{item_id}: {reason}")]
    InvalidAnswer {
        category_id: String,
        item_id: String,
        reason: String,
    },

    /// Remote store failure
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for EvalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EvalError::NotFound(id),
            other => EvalError::Store(other.to_string()),
        }
    }
}

pub type EvalResult<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: EvalError = StoreError::NotFound("abc".into()).into();
        assert_eq!(err, EvalError::NotFound("abc".into()));

        let err: EvalError = StoreError::Backend("disk full".into()).into();
        assert!(matches!(err, EvalError::Store(msg) if msg.contains("disk full")));
    }

    #[test]
    fn test_selection_limit_message() {
        let err = EvalError::SelectionLimitExceeded { limit: 3 };
        assert_eq!(err.to_string(), "You can compare up to 3 homes");
    }
}
