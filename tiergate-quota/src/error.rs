//! Error types for the quota ledger.

use thiserror::Error;
use tiergate_store::StoreError;

/// Result type for ledger operations.
pub type QuotaResult<T> = Result<T, QuotaError>;

/// Errors surfaced by the daily quota ledger.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A ledger document could not be decoded.
    #[error("malformed ledger record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Conditional writes kept losing to concurrent activations.
    #[error("activation contention not resolved after retries")]
    Contention,
}
