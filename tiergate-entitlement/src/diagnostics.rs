//! Per-source diagnostics for entitlement lookups.
//!
//! The resolver deliberately hides which source matched; this collaborator
//! exposes it, per source, for operators chasing stale-claims problems. It
//! is a separate, explicitly-gated surface — never wired into the request
//! path.

use crate::resolver::{IdentityHint, Resolver};
use crate::sources::{
    ProviderClaimsSource, AUTHORITATIVE_COLLECTION, CLAIMS_COLLECTION, LEGACY_COLLECTION,
};
use serde::{Deserialize, Serialize};
use crate::error::ResolveResult;
use serde_json::Value;
use tiergate_store::DocumentStore;
use tiergate_types::{SourceTag, Tier};
use tracing::info;

/// Claims fields that mark a subscription; stripped by
/// [`Resolver::clear_premium_claims`].
const PREMIUM_CLAIM_FIELDS: &[&str] = &[
    "premium",
    "stripe_role",
    "subscription_status",
    "stripe_customer_id",
    "stripe_subscription_id",
    "subscription_start",
    "subscription_end",
];

/// What one source knows about a subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcePresence {
    /// Whether a record exists in this source.
    pub present: bool,
    /// The raw status field, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_status: Option<String>,
    /// Lookup error, when the source was unreachable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourcePresence {
    fn from_doc(doc: &Value) -> Self {
        Self {
            present: true,
            raw_status: doc
                .get("subscription_status")
                .and_then(Value::as_str)
                .map(str::to_string),
            error: None,
        }
    }

    fn absent() -> Self {
        Self::default()
    }

    fn failed(err: impl ToString) -> Self {
        Self {
            present: false,
            raw_status: None,
            error: Some(err.to_string()),
        }
    }
}

/// The full diagnostic picture for one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    /// Subject id the report describes, when one could be determined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    /// Authoritative subscription store presence.
    pub authoritative: SourcePresence,
    /// Provider-claims presence, with whether the claims assert premium.
    pub provider_claims: SourcePresence,
    /// Whether the provider claims carry any premium marker.
    pub claims_assert_premium: bool,
    /// Legacy profile store presence.
    pub legacy_profile: SourcePresence,
    /// The source the resolver would pick, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_source: Option<SourceTag>,
    /// The tier the caller would end up with (default applied).
    pub effective_tier: Tier,
    /// Premium claims shadowed by a higher-precedence record — the classic
    /// stale-claims symptom.
    pub stale_provider_claims: bool,
}

impl Resolver {
    /// Builds a per-source report for a subject.
    ///
    /// Unlike [`Resolver::resolve`], every source is consulted even after a
    /// match, so shadowed records are visible.
    pub async fn inspect(&self, hint: &IdentityHint) -> SourceReport {
        let store = self.store();

        // Pin down a subject id first; an email-only hint needs the
        // authoritative or legacy record to learn it.
        let resolved = self.resolve(hint).await.ok().flatten();
        let subject_id = hint
            .subject_id
            .clone()
            .or_else(|| resolved.as_ref().map(|e| e.subject_id.clone()));

        let (authoritative, provider_claims, claims_assert_premium, legacy_profile) =
            match subject_id.as_deref() {
                Some(id) => {
                    let authoritative = presence(store, AUTHORITATIVE_COLLECTION, id).await;
                    let (claims, premium) = match store.get(CLAIMS_COLLECTION, id).await {
                        Ok(Some(v)) => {
                            let premium =
                                ProviderClaimsSource::<()>::indicates_premium(&v.doc);
                            (SourcePresence::from_doc(&v.doc), premium)
                        }
                        Ok(None) => (SourcePresence::absent(), false),
                        Err(err) => (SourcePresence::failed(err), false),
                    };
                    let legacy = presence(store, LEGACY_COLLECTION, id).await;
                    (authoritative, claims, premium, legacy)
                }
                None => (
                    SourcePresence::absent(),
                    SourcePresence::absent(),
                    false,
                    SourcePresence::absent(),
                ),
            };

        let winning_source = resolved.as_ref().map(|e| e.source);
        let effective_tier = resolved.as_ref().map_or(Tier::Limited, |e| e.tier);
        let stale_provider_claims = claims_assert_premium
            && winning_source.is_some_and(|w| w != SourceTag::ProviderClaims)
            && effective_tier != Tier::Premium;

        SourceReport {
            subject_id,
            authoritative,
            provider_claims,
            claims_assert_premium,
            legacy_profile,
            winning_source,
            effective_tier,
            stale_provider_claims,
        }
    }

    /// Strips subscription markers from a subject's provider-claims
    /// record, preserving unrelated claims. The remediation half of the
    /// stale-claims story: [`Resolver::inspect`] finds them, this removes
    /// them so the higher-precedence sources decide again.
    ///
    /// Returns the names of the removed fields; an absent record or one
    /// with no markers removes nothing and writes nothing.
    ///
    /// # Errors
    ///
    /// Fails if the claims record cannot be read or written back.
    pub async fn clear_premium_claims(&self, subject_id: &str) -> ResolveResult<Vec<String>> {
        let store = self.store();
        let Some(versioned) = store.get(CLAIMS_COLLECTION, subject_id).await? else {
            return Ok(Vec::new());
        };

        let mut doc = versioned.doc;
        let mut removed = Vec::new();
        if let Some(fields) = doc.as_object_mut() {
            for field in PREMIUM_CLAIM_FIELDS {
                if fields.remove(*field).is_some() {
                    removed.push((*field).to_string());
                }
            }
        }
        if removed.is_empty() {
            return Ok(removed);
        }

        store.put(CLAIMS_COLLECTION, subject_id, doc).await?;
        info!(subject_id, cleared = removed.len(), "premium claims cleared");
        Ok(removed)
    }
}

async fn presence(
    store: &std::sync::Arc<dyn DocumentStore>,
    collection: &str,
    key: &str,
) -> SourcePresence {
    match store.get(collection, key).await {
        Ok(Some(v)) => SourcePresence::from_doc(&v.doc),
        Ok(None) => SourcePresence::absent(),
        Err(err) => SourcePresence::failed(err),
    }
}
