//! Shared fixtures for resolver tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use tiergate_entitlement::{
    Resolver, AUTHORITATIVE_COLLECTION, CLAIMS_COLLECTION, LEGACY_COLLECTION,
};
use tiergate_store::memory::faulty::FaultyStore;
use tiergate_store::{DocumentStore, MemoryStore};

/// A memory store plus a resolver over it.
pub struct Fixture {
    pub store: MemoryStore,
    pub resolver: Resolver,
}

pub fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let resolver = Resolver::new(Arc::new(store.clone()));
    Fixture { store, resolver }
}

/// A fixture whose store can be made to fail per collection.
pub struct FaultyFixture {
    pub store: FaultyStore,
    pub resolver: Resolver,
}

pub fn faulty_fixture() -> FaultyFixture {
    let store = FaultyStore::new(MemoryStore::new());
    let resolver = Resolver::new(Arc::new(store.clone()));
    FaultyFixture { store, resolver }
}

pub async fn seed_authoritative(store: &impl DocumentStore, subject_id: &str, doc: Value) {
    store
        .put(AUTHORITATIVE_COLLECTION, subject_id, doc)
        .await
        .expect("seed authoritative");
}

pub async fn seed_claims(store: &impl DocumentStore, subject_id: &str, doc: Value) {
    store
        .put(CLAIMS_COLLECTION, subject_id, doc)
        .await
        .expect("seed claims");
}

pub async fn seed_legacy(store: &impl DocumentStore, subject_id: &str, doc: Value) {
    store
        .put(LEGACY_COLLECTION, subject_id, doc)
        .await
        .expect("seed legacy");
}

/// A minimal authoritative record with the given status.
pub fn authoritative_doc(email: &str, status: &str) -> Value {
    json!({
        "email": email,
        "subscription_status": status,
        "subscription_start": "2026-01-01T00:00:00Z",
    })
}

/// A legacy profile with the given status.
pub fn legacy_doc(email: &str, status: &str) -> Value {
    json!({
        "email": email,
        "subscription_status": status,
    })
}
