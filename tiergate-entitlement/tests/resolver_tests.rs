mod common;

use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use tiergate_entitlement::{
    IdentityHint, ResolveError, AUTHORITATIVE_COLLECTION, CLAIMS_COLLECTION, LEGACY_COLLECTION,
};
use tiergate_store::DocumentStore;
use tiergate_types::{SourceTag, Tier};

// ── Input validation ─────────────────────────────────────────────

#[tokio::test]
async fn empty_hint_is_rejected() {
    let fx = fixture();
    let err = fx.resolver.resolve(&IdentityHint::default()).await.unwrap_err();
    assert!(matches!(err, ResolveError::MissingIdentity));
}

#[tokio::test]
async fn whitespace_only_hint_is_rejected() {
    let fx = fixture();
    let hint = IdentityHint {
        subject_id: Some("   ".to_string()),
        email: Some("".to_string()),
    };
    let err = fx.resolver.resolve(&hint).await.unwrap_err();
    assert!(matches!(err, ResolveError::MissingIdentity));
}

// ── Precedence by id ─────────────────────────────────────────────

#[tokio::test]
async fn authoritative_record_wins() {
    let fx = fixture();
    seed_authoritative(&fx.store, "u1", authoritative_doc("u1@x.com", "premium")).await;

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.tier, Tier::Premium);
    assert_eq!(found.source, SourceTag::Authoritative);
    assert_eq!(found.email.as_deref(), Some("u1@x.com"));
}

#[tokio::test]
async fn stale_premium_claims_cannot_override_authoritative_limited() {
    // Subject was demoted to limited in the authoritative store, but a
    // premium claim issued before the demotion is still lying around.
    let fx = fixture();
    seed_authoritative(&fx.store, "u1", authoritative_doc("u1@x.com", "limited")).await;
    seed_claims(&fx.store, "u1", json!({"premium": true})).await;

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.tier, Tier::Limited);
    assert_eq!(found.source, SourceTag::Authoritative);
}

#[tokio::test]
async fn authoritative_presence_without_status_implies_premium() {
    let fx = fixture();
    seed_authoritative(&fx.store, "u1", json!({"email": "u1@x.com"})).await;

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.tier, Tier::Premium);
}

#[tokio::test]
async fn empty_status_in_authoritative_also_implies_premium() {
    let fx = fixture();
    seed_authoritative(&fx.store, "u1", json!({"email": "u1@x.com", "subscription_status": ""}))
        .await;

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.tier, Tier::Premium);
}

#[tokio::test]
async fn premium_claims_used_when_no_authoritative_record() {
    let fx = fixture();
    for doc in [
        json!({"stripe_role": "premium"}),
        json!({"premium": true}),
        json!({"subscription_status": "premium"}),
    ] {
        fx.store.delete(CLAIMS_COLLECTION, "u1").await.unwrap();
        seed_claims(&fx.store, "u1", doc).await;
        let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
        assert_eq!(found.tier, Tier::Premium);
        assert_eq!(found.source, SourceTag::ProviderClaims);
    }
}

#[tokio::test]
async fn non_premium_claims_fall_through_to_legacy() {
    let fx = fixture();
    seed_claims(&fx.store, "u1", json!({"stripe_role": "basic"})).await;
    seed_legacy(&fx.store, "u1", legacy_doc("u1@x.com", "limited")).await;

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.tier, Tier::Limited);
    assert_eq!(found.source, SourceTag::LegacyProfile);
}

#[tokio::test]
async fn legacy_record_with_empty_status_defaults_to_free() {
    let fx = fixture();
    seed_legacy(&fx.store, "u1", json!({"email": "u1@x.com"})).await;

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.tier, Tier::Free);
    assert_eq!(found.source, SourceTag::LegacyProfile);
}

#[tokio::test]
async fn deprecated_trial_status_normalizes_to_limited() {
    let fx = fixture();
    seed_legacy(&fx.store, "u1", legacy_doc("u1@x.com", "trial")).await;

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.tier, Tier::Limited);
}

#[tokio::test]
async fn unknown_subject_resolves_to_none() {
    let fx = fixture();
    let found = fx.resolver.resolve(&IdentityHint::by_id("ghost")).await.unwrap();
    assert!(found.is_none());
}

// ── Precedence by email ──────────────────────────────────────────

#[tokio::test]
async fn email_lookup_hits_authoritative_first() {
    let fx = fixture();
    seed_authoritative(&fx.store, "u1", authoritative_doc("u1@x.com", "premium")).await;
    seed_legacy(&fx.store, "u2", legacy_doc("u1@x.com", "free")).await;

    let found = fx
        .resolver
        .resolve(&IdentityHint::by_email("u1@x.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.source, SourceTag::Authoritative);
    assert_eq!(found.subject_id, "u1");
}

#[tokio::test]
async fn email_lookup_skips_provider_claims() {
    // Claims are id-keyed; an email-only hint must not see them.
    let fx = fixture();
    seed_claims(&fx.store, "u1", json!({"premium": true, "email": "u1@x.com"})).await;

    let found = fx.resolver.resolve(&IdentityHint::by_email("u1@x.com")).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn email_lookup_falls_back_to_legacy() {
    let fx = fixture();
    seed_legacy(&fx.store, "u9", legacy_doc("u9@x.com", "limited")).await;

    let found = fx
        .resolver
        .resolve(&IdentityHint::by_email("u9@x.com"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.subject_id, "u9");
    assert_eq!(found.source, SourceTag::LegacyProfile);
}

#[tokio::test]
async fn id_takes_priority_over_email_in_mixed_hint() {
    let fx = fixture();
    seed_authoritative(&fx.store, "u1", authoritative_doc("u1@x.com", "limited")).await;
    seed_authoritative(&fx.store, "u2", authoritative_doc("u2@x.com", "premium")).await;

    let hint = IdentityHint {
        subject_id: Some("u1".to_string()),
        email: Some("u2@x.com".to_string()),
    };
    let found = fx.resolver.resolve(&hint).await.unwrap().unwrap();
    assert_eq!(found.subject_id, "u1");
    assert_eq!(found.tier, Tier::Limited);
}

// ── Degraded sources ─────────────────────────────────────────────

#[tokio::test]
async fn failing_authoritative_source_degrades_to_claims() {
    let fx = faulty_fixture();
    seed_claims(&fx.store, "u1", json!({"premium": true})).await;
    fx.store.fail_collection(AUTHORITATIVE_COLLECTION);

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap().unwrap();
    assert_eq!(found.source, SourceTag::ProviderClaims);
}

#[tokio::test]
async fn all_sources_failing_resolves_to_none() {
    let fx = faulty_fixture();
    seed_legacy(&fx.store, "u1", legacy_doc("u1@x.com", "premium")).await;
    fx.store.fail_collection(AUTHORITATIVE_COLLECTION);
    fx.store.fail_collection(CLAIMS_COLLECTION);
    fx.store.fail_collection(LEGACY_COLLECTION);

    let found = fx.resolver.resolve(&IdentityHint::by_id("u1")).await.unwrap();
    assert!(found.is_none());
}

// ── is_premium ───────────────────────────────────────────────────

#[tokio::test]
async fn is_premium_ignores_legacy_store() {
    let fx = fixture();
    seed_legacy(&fx.store, "u1", legacy_doc("u1@x.com", "premium")).await;

    assert!(!fx.resolver.is_premium("u1").await.unwrap());

    seed_authoritative(&fx.store, "u1", authoritative_doc("u1@x.com", "premium")).await;
    assert!(fx.resolver.is_premium("u1").await.unwrap());
}
