//! Error types shared across the `lore` crates.

use thiserror::Error;

/// Errors that can occur in retrieval operations.
#[derive(Debug, Error)]
pub enum LoreError {
    /// An input vector did not match the configured embedding dimension.
    ///
    /// This is a programmer or configuration error: it is surfaced
    /// immediately and never retried.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the component was configured with.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// The document store could not be reached.
    #[error("document store unavailable: {0}")]
    StoreUnavailable(String),

    /// The embedding provider failed or returned a malformed response.
    #[error("embedding provider error ({provider}): {message}")]
    Embedding {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion provider failed or returned a malformed response.
    #[error("completion provider error ({provider}): {message}")]
    Completion {
        /// The provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// No document exists with the requested id.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// A configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, LoreError>;
