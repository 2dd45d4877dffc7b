//! Error types for entitlement resolution.

use thiserror::Error;
use tiergate_store::StoreError;

/// Result type for resolution operations.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors surfaced by the resolver.
///
/// Per-source lookup failures are deliberately *not* here; they are logged
/// and treated as "source absent" so resolution degrades gracefully. Only
/// input errors and failures of write operations (profile admin) surface.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither a subject id nor an email was supplied.
    #[error("either a subject id or an email is required")]
    MissingIdentity,

    /// A write against the backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
