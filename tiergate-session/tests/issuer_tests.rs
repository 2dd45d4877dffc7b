use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tiergate_session::{
    CredentialClaims, CredentialSigner, SessionError, SessionIssuer, SessionStatus,
    CREDENTIAL_TTL_SECS, SESSIONS_COLLECTION,
};
use tiergate_store::memory::faulty::FaultyStore;
use tiergate_store::MemoryStore;
use tiergate_types::{Tier, DAILY_LIMIT_MS, UNLIMITED_MS};

fn issuer() -> (MemoryStore, SessionIssuer) {
    let store = MemoryStore::new();
    let issuer = SessionIssuer::new(
        Arc::new(store.clone()),
        CredentialSigner::from_seed(b"issuer-test-seed"),
    );
    (store, issuer)
}

fn noon() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn issue_persists_active_session_with_zeroed_counters() {
    let (store, issuer) = issuer();
    let issued = issuer
        .issue("u1", "u1@x.com", Tier::Limited, "fp-1", "203.0.113.9", "ext/1.0", noon())
        .await
        .unwrap();

    assert_eq!(issued.session.status, SessionStatus::Active);
    assert_eq!(issued.session.cumulative_usage_ms, 0);
    assert_eq!(issued.session.heartbeat_count, 0);
    assert_eq!(issued.session.started_at, noon());
    assert_eq!(issued.expires_in_secs, CREDENTIAL_TTL_SECS);
    assert_eq!(store.len(SESSIONS_COLLECTION), 1);

    let fetched = issuer.get(&issued.session.session_id).await.unwrap().unwrap();
    assert_eq!(fetched, issued.session);
}

#[tokio::test]
async fn credential_embeds_resolved_tier_and_binding() {
    let (_, issuer) = issuer();
    let issued = issuer
        .issue("u1", "u1@x.com", Tier::Premium, "fp-1", "203.0.113.9", "ext/1.0", noon())
        .await
        .unwrap();

    let claims =
        CredentialClaims::verify(&issued.token, &issuer.verifying_key_bytes(), noon()).unwrap();
    assert_eq!(claims.session_id, issued.session.session_id);
    assert_eq!(claims.sub, "u1");
    assert_eq!(claims.tier, Tier::Premium);
    assert_eq!(claims.device_fingerprint, "fp-1");
    assert_eq!(claims.remote_addr, "203.0.113.9");
    assert_eq!(claims.exp - claims.iat, CREDENTIAL_TTL_SECS);
}

#[tokio::test]
async fn daily_limit_sentinel_follows_tier() {
    let (_, issuer) = issuer();
    let premium = issuer
        .issue("u1", "u1@x.com", Tier::Premium, "fp-1", "ip", "ua", noon())
        .await
        .unwrap();
    assert_eq!(premium.daily_limit_ms(), UNLIMITED_MS);

    let limited = issuer
        .issue("u2", "u2@x.com", Tier::Limited, "fp-2", "ip", "ua", noon())
        .await
        .unwrap();
    assert_eq!(limited.daily_limit_ms(), DAILY_LIMIT_MS);
}

#[tokio::test]
async fn persistence_failure_is_fatal_and_leaves_nothing() {
    let memory = MemoryStore::new();
    let store = FaultyStore::new(memory.clone());
    store.fail_collection(SESSIONS_COLLECTION);
    let issuer = SessionIssuer::new(
        Arc::new(store),
        CredentialSigner::from_seed(b"issuer-test-seed"),
    );

    let err = issuer
        .issue("u1", "u1@x.com", Tier::Limited, "fp-1", "ip", "ua", noon())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Persistence(_)));
    assert!(memory.is_empty(SESSIONS_COLLECTION));
}

#[tokio::test]
async fn distinct_sessions_for_repeated_issuance() {
    let (store, issuer) = issuer();
    let a = issuer
        .issue("u1", "u1@x.com", Tier::Limited, "fp-1", "ip", "ua", noon())
        .await
        .unwrap();
    let b = issuer
        .issue("u1", "u1@x.com", Tier::Limited, "fp-1", "ip", "ua", noon())
        .await
        .unwrap();
    assert_ne!(a.session.session_id, b.session.session_id);
    assert_eq!(store.len(SESSIONS_COLLECTION), 2);
}
