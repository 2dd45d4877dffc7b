//! Error types for the store adapter layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the operation.
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored document could not be decoded into the expected shape.
    #[error("malformed document in {collection}/{key}: {reason}")]
    MalformedDocument {
        /// Collection the document lives in.
        collection: String,
        /// Document key.
        key: String,
        /// What failed to decode.
        reason: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend did not answer within its own timeout.
    #[error("store operation timed out")]
    Timeout,
}
