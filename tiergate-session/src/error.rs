//! Error types for session issuance and credential handling.

use thiserror::Error;
use tiergate_store::StoreError;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the session issuer and credential codec.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Persisting the session record failed. Fatal to the issuance call:
    /// no partial session/credential pair is ever returned.
    #[error("session persistence failed: {0}")]
    Persistence(#[from] StoreError),

    /// Credential token format is invalid.
    #[error("invalid credential format: {0}")]
    InvalidToken(String),

    /// Ed25519 signature verification failed.
    #[error("credential signature invalid")]
    InvalidSignature,

    /// The credential is past its expiry.
    #[error("credential expired at {0}")]
    Expired(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
