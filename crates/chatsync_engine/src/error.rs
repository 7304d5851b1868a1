//! Error types for the engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while driving collection lifecycles.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A page source failed to deliver a page.
    ///
    /// Retries and timeouts are the transport collaborator's job; by the
    /// time this surfaces, the fetch has conclusively failed.
    #[error("page source error: {message}")]
    PageSource {
        /// Description of the failure.
        message: String,
    },

    /// Store error during a backfill.
    #[error("store error: {0}")]
    Store(#[from] chatsync_store::StoreError),

    /// A lifecycle method was called in a state that does not allow it.
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: String,
        /// Attempted target state.
        to: String,
    },

    /// The backfill was cancelled.
    #[error("backfill cancelled")]
    Cancelled,
}

impl EngineError {
    /// Creates a page source error.
    pub fn page_source(message: impl Into<String>) -> Self {
        Self::PageSource {
            message: message.into(),
        }
    }

    /// Creates an invalid transition error.
    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}
