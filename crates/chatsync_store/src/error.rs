//! Error types for the store.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// A stale mutation is deliberately not represented here: staleness is an
/// ordinary [`ApplyResult`](crate::ApplyResult) outcome under redelivery,
/// logged at debug level at most.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Payload missing required fields or referencing an unknown entity.
    #[error("malformed mutation: {reason}")]
    MalformedMutation {
        /// What the validation found.
        reason: String,
    },

    /// A progress counter increment arrived after the counter latched.
    #[error("progress counter driven past its total of {total}")]
    CounterOverrun {
        /// The counter's configured total.
        total: usize,
    },

    /// Entity could not be serialized for the persistence backing.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The persistence backing rejected a write.
    #[error("backing error: {message}")]
    Backing {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates a malformed-mutation error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMutation {
            reason: reason.into(),
        }
    }

    /// Creates a backing error.
    pub fn backing(message: impl Into<String>) -> Self {
        Self::Backing {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::malformed("missing room id");
        assert_eq!(err.to_string(), "malformed mutation: missing room id");

        let err = StoreError::CounterOverrun { total: 5 };
        assert!(err.to_string().contains('5'));
    }
}
