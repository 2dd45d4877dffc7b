//! In-process document store backend.
//!
//! Serves tests and the default gateway wiring. Atomicity of `insert` and
//! `replace` comes from holding the map lock across the read-check-write,
//! which is exactly the conditional-write guarantee the ledger needs.

use crate::{DocumentStore, StoreResult, Versioned};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Collection = HashMap<String, (u64, Value)>;

/// A thread-safe in-memory [`DocumentStore`].
///
/// Cloning is cheap and shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection (test helper).
    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .expect("memory store lock poisoned")
            .get(collection)
            .map_or(0, HashMap::len)
    }

    /// Returns true if a collection holds no documents.
    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Versioned>> {
        let collections = self.collections.lock().expect("memory store lock poisoned");
        Ok(collections.get(collection).and_then(|c| {
            c.get(key).map(|(version, doc)| Versioned {
                version: *version,
                doc: doc.clone(),
            })
        }))
    }

    async fn put(&self, collection: &str, key: &str, doc: Value) -> StoreResult<()> {
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();
        let version = coll.get(key).map_or(1, |(v, _)| v + 1);
        coll.insert(key.to_string(), (version, doc));
        Ok(())
    }

    async fn insert(&self, collection: &str, key: &str, doc: Value) -> StoreResult<bool> {
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        let coll = collections.entry(collection.to_string()).or_default();
        if coll.contains_key(key) {
            return Ok(false);
        }
        coll.insert(key.to_string(), (1, doc));
        Ok(true)
    }

    async fn replace(
        &self,
        collection: &str,
        key: &str,
        expected_version: u64,
        doc: Value,
    ) -> StoreResult<bool> {
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(false);
        };
        match coll.get_mut(key) {
            Some((version, body)) if *version == expected_version => {
                *version += 1;
                *body = doc;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn merge(&self, collection: &str, key: &str, fields: Value) -> StoreResult<bool> {
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some((version, body)) = coll.get_mut(key) else {
            return Ok(false);
        };
        match (&mut *body, fields) {
            (Value::Object(target), Value::Object(updates)) => {
                for (k, v) in updates {
                    target.insert(k, v);
                }
            }
            (body, fields) => *body = fields,
        }
        *version += 1;
        Ok(true)
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
        let mut collections = self.collections.lock().expect("memory store lock poisoned");
        if let Some(coll) = collections.get_mut(collection) {
            coll.remove(key);
        }
        Ok(())
    }

    async fn find_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        limit: usize,
    ) -> StoreResult<Vec<(String, Versioned)>> {
        let collections = self.collections.lock().expect("memory store lock poisoned");
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<(String, Versioned)> = coll
            .iter()
            .filter(|(_, (_, doc))| doc.get(field).and_then(Value::as_str) == Some(value))
            .map(|(k, (version, doc))| {
                (
                    k.clone(),
                    Versioned {
                        version: *version,
                        doc: doc.clone(),
                    },
                )
            })
            .collect();
        // Deterministic order for limit semantics.
        hits.sort_by(|a, b| a.0.cmp(&b.0));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// A wrapper that fails selected operations, for exercising degraded-source
/// paths in tests.
pub mod faulty {
    use super::*;
    use crate::StoreError;
    use std::collections::HashSet;

    /// Delegates to an inner [`MemoryStore`] but fails every operation on
    /// the named collections.
    #[derive(Debug, Clone)]
    pub struct FaultyStore {
        inner: MemoryStore,
        failing: Arc<Mutex<HashSet<String>>>,
    }

    impl FaultyStore {
        /// Wraps `inner` with no failing collections.
        #[must_use]
        pub fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                failing: Arc::new(Mutex::new(HashSet::new())),
            }
        }

        /// Starts failing all operations on `collection`.
        pub fn fail_collection(&self, collection: &str) {
            self.failing
                .lock()
                .expect("faulty store lock poisoned")
                .insert(collection.to_string());
        }

        /// Stops failing operations on `collection`.
        pub fn restore_collection(&self, collection: &str) {
            self.failing
                .lock()
                .expect("faulty store lock poisoned")
                .remove(collection);
        }

        fn check(&self, collection: &str) -> StoreResult<()> {
            let failing = self.failing.lock().expect("faulty store lock poisoned");
            if failing.contains(collection) {
                Err(StoreError::Backend(format!(
                    "injected failure for collection {collection}"
                )))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FaultyStore {
        async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Versioned>> {
            self.check(collection)?;
            self.inner.get(collection, key).await
        }

        async fn put(&self, collection: &str, key: &str, doc: Value) -> StoreResult<()> {
            self.check(collection)?;
            self.inner.put(collection, key, doc).await
        }

        async fn insert(&self, collection: &str, key: &str, doc: Value) -> StoreResult<bool> {
            self.check(collection)?;
            self.inner.insert(collection, key, doc).await
        }

        async fn replace(
            &self,
            collection: &str,
            key: &str,
            expected_version: u64,
            doc: Value,
        ) -> StoreResult<bool> {
            self.check(collection)?;
            self.inner.replace(collection, key, expected_version, doc).await
        }

        async fn merge(&self, collection: &str, key: &str, fields: Value) -> StoreResult<bool> {
            self.check(collection)?;
            self.inner.merge(collection, key, fields).await
        }

        async fn delete(&self, collection: &str, key: &str) -> StoreResult<()> {
            self.check(collection)?;
            self.inner.delete(collection, key).await
        }

        async fn find_by_field(
            &self,
            collection: &str,
            field: &str,
            value: &str,
            limit: usize,
        ) -> StoreResult<Vec<(String, Versioned)>> {
            self.check(collection)?;
            self.inner.find_by_field(collection, field, value, limit).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn insert_is_create_if_absent() {
        let store = MemoryStore::new();
        assert!(store.insert("c", "k", json!({"a": 1})).await.unwrap());
        assert!(!store.insert("c", "k", json!({"a": 2})).await.unwrap());
        let doc = store.get("c", "k").await.unwrap().unwrap();
        assert_eq!(doc.doc["a"], 1);
        assert_eq!(doc.version, 1);
    }

    #[tokio::test]
    async fn replace_requires_matching_version() {
        let store = MemoryStore::new();
        store.put("c", "k", json!({"a": 1})).await.unwrap();
        let v = store.get("c", "k").await.unwrap().unwrap().version;
        assert!(store.replace("c", "k", v, json!({"a": 2})).await.unwrap());
        // Stale version loses.
        assert!(!store.replace("c", "k", v, json!({"a": 3})).await.unwrap());
        assert_eq!(store.get("c", "k").await.unwrap().unwrap().doc["a"], 2);
    }

    #[tokio::test]
    async fn merge_updates_existing_fields_only() {
        let store = MemoryStore::new();
        assert!(!store.merge("c", "missing", json!({"a": 1})).await.unwrap());
        store.put("c", "k", json!({"a": 1, "b": 2})).await.unwrap();
        assert!(store.merge("c", "k", json!({"b": 3, "c": 4})).await.unwrap());
        let doc = store.get("c", "k").await.unwrap().unwrap().doc;
        assert_eq!(doc, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[tokio::test]
    async fn find_by_field_respects_limit() {
        let store = MemoryStore::new();
        store.put("c", "k1", json!({"email": "a@x.com"})).await.unwrap();
        store.put("c", "k2", json!({"email": "a@x.com"})).await.unwrap();
        store.put("c", "k3", json!({"email": "b@x.com"})).await.unwrap();
        let hits = store.find_by_field("c", "email", "a@x.com", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "k1");
    }

    #[tokio::test]
    async fn delete_absent_key_is_ok() {
        let store = MemoryStore::new();
        store.delete("c", "nope").await.unwrap();
    }
}
