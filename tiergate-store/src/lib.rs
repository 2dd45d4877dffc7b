//! Document-store adapter abstraction for tiergate.
//!
//! The entitlement sources, the daily-activation ledger, and the session
//! store all live in a schemaless document database with get / set /
//! update / query-by-field / limit semantics. This crate abstracts that
//! collaborator behind the [`DocumentStore`] trait so the resolution and
//! quota logic can be exercised against an in-process backend.
//!
//! # Versioned documents
//!
//! Every read returns a [`Versioned`] wrapper carrying a monotonic per-key
//! version. The version feeds [`DocumentStore::replace`], the
//! compare-and-swap primitive the quota ledger uses to close its
//! concurrent-activation race. Plain `put` is last-writer-wins and must not
//! be used where at-most-one semantics matter.

mod error;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;

/// A document plus its store-assigned version.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    /// Monotonic per-key version, starting at 1 on first write.
    pub version: u64,
    /// The document body.
    pub doc: Value,
}

/// Uniform access to a schemaless document database.
///
/// Collections are flat namespaces of string-keyed JSON documents. All
/// operations are bounded by the backend's own timeout; none block
/// indefinitely.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by key. `Ok(None)` when absent.
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Versioned>>;

    /// Writes a document unconditionally (last-writer-wins).
    async fn put(&self, collection: &str, key: &str, doc: Value) -> StoreResult<()>;

    /// Creates a document only if the key is absent.
    ///
    /// Returns `true` when the document was created, `false` when another
    /// writer got there first. Atomic with respect to concurrent `insert`
    /// and `replace` calls on the same key.
    async fn insert(&self, collection: &str, key: &str, doc: Value) -> StoreResult<bool>;

    /// Replaces a document only if its current version is
    /// `expected_version`.
    ///
    /// Returns `true` on success, `false` when the document was missing or
    /// its version moved (a concurrent writer won).
    async fn replace(
        &self,
        collection: &str,
        key: &str,
        expected_version: u64,
        doc: Value,
    ) -> StoreResult<bool>;

    /// Shallow-merges `fields` into an existing document.
    ///
    /// Returns `false` when the document does not exist (no upsert).
    async fn merge(&self, collection: &str, key: &str, fields: Value) -> StoreResult<bool>;

    /// Deletes a document. Deleting an absent key is not an error.
    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()>;

    /// Returns up to `limit` documents whose top-level `field` equals
    /// `value` (string equality, matching the backend's query-by-field
    /// semantics).
    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> StoreResult<Vec<(String, Versioned)>>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Versioned>> {
        (**self).get(collection, key).await
    }

    async fn put(&self, collection: &str, key: &str, doc: Value) -> StoreResult<()> {
        (**self).put(collection, key, doc).await
    }

    async fn insert(&self, collection: &str, key: &str, doc: Value) -> StoreResult<bool> {
        (**self).insert(collection, key, doc).await
    }

    async fn replace(
        &self,
        collection: &str,
        key: &str,
        expected_version: u64,
        doc: Value,
    ) -> StoreResult<bool> {
        (**self).replace(collection, key, expected_version, doc).await
    }

    async fn merge(&self, collection: &str, key: &str, fields: Value) -> StoreResult<bool> {
        (**self).merge(collection, key, fields).await
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        (**self).delete(collection, key).await
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> StoreResult<Vec<(String, Versioned)>> {
        (**self).find_by_field(collection, field, value, limit).await
    }
}
