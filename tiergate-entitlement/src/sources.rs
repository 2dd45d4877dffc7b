//! The three entitlement sources behind one capability interface.
//!
//! Each source knows how to turn its own document shape into a resolved
//! [`Entitlement`]. The resolver only sees the [`EntitlementSource`] trait
//! and iterates in precedence order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tiergate_store::{DocumentStore, StoreResult};
use tiergate_types::{Entitlement, SourceTag, Tier};

/// Authoritative subscription store collection.
pub const AUTHORITATIVE_COLLECTION: &str = "premium_users";

/// Identity-provider custom-claims collection (id-keyed).
pub const CLAIMS_COLLECTION: &str = "provider_claims";

/// Legacy profile store collection.
pub const LEGACY_COLLECTION: &str = "users";

/// One entitlement data source.
#[async_trait]
pub(crate) trait EntitlementSource: Send + Sync {
    /// Which source this is (also its precedence tag).
    fn tag(&self) -> SourceTag;

    /// Looks up a subject by id. `Ok(None)` when this source has no match.
    async fn lookup_by_id(&self, subject_id: &str) -> StoreResult<Option<Entitlement>>;

    /// Looks up a subject by email. Sources that cannot be queried by email
    /// return `Ok(None)`.
    async fn lookup_by_email(&self, email: &str) -> StoreResult<Option<Entitlement>>;
}

/// Pulls a non-empty string field out of a document.
fn str_field<'a>(doc: &'a Value, field: &str) -> Option<&'a str> {
    doc.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn date_field(doc: &Value, field: &str) -> Option<DateTime<Utc>> {
    str_field(doc, field)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// The authoritative subscription store.
///
/// A record being present here with no status field means `premium`
/// ("presence implies premium") — a narrower rule than the global
/// default-to-limited, kept separate on purpose.
pub(crate) struct AuthoritativeSource<S> {
    pub store: S,
}

impl<S: DocumentStore> AuthoritativeSource<S> {
    fn decode(&self, subject_id: &str, doc: &Value) -> Entitlement {
        let tier = match str_field(doc, "subscription_status") {
            Some(status) => Tier::normalize(Some(status)),
            // Presence implies premium.
            None => Tier::Premium,
        };
        Entitlement {
            subject_id: str_field(doc, "subject_id").unwrap_or(subject_id).to_string(),
            email: str_field(doc, "email").map(str::to_string),
            tier,
            source: SourceTag::Authoritative,
            valid_from: date_field(doc, "subscription_start"),
            valid_until: date_field(doc, "subscription_end"),
            quota_override_ms: doc.get("quota_override_ms").and_then(Value::as_i64),
        }
    }
}

#[async_trait]
impl<S: DocumentStore> EntitlementSource for AuthoritativeSource<S> {
    fn tag(&self) -> SourceTag {
        SourceTag::Authoritative
    }

    async fn lookup_by_id(&self, subject_id: &str) -> StoreResult<Option<Entitlement>> {
        let hit = self.store.get(AUTHORITATIVE_COLLECTION, subject_id).await?;
        Ok(hit.map(|v| self.decode(subject_id, &v.doc)))
    }

    async fn lookup_by_email(&self, email: &str) -> StoreResult<Option<Entitlement>> {
        let hits = self
            .store
            .find_by_field(AUTHORITATIVE_COLLECTION, "email", email, 1)
            .await?;
        Ok(hits.first().map(|(key, v)| self.decode(key, &v.doc)))
    }
}

/// Identity-provider custom claims.
///
/// Claims only ever assert premium. Three marker fields are honored; a
/// claims record with none of them set is treated as no match so the scan
/// falls through to the legacy store. Claims are id-keyed and cannot be
/// queried by email.
pub(crate) struct ProviderClaimsSource<S> {
    pub store: S,
}

impl<S> ProviderClaimsSource<S> {
    pub(crate) fn indicates_premium(doc: &Value) -> bool {
        str_field(doc, "stripe_role") == Some("premium")
            || doc.get("premium").and_then(Value::as_bool) == Some(true)
            || str_field(doc, "subscription_status") == Some("premium")
    }
}

#[async_trait]
impl<S: DocumentStore> EntitlementSource for ProviderClaimsSource<S> {
    fn tag(&self) -> SourceTag {
        SourceTag::ProviderClaims
    }

    async fn lookup_by_id(&self, subject_id: &str) -> StoreResult<Option<Entitlement>> {
        let Some(hit) = self.store.get(CLAIMS_COLLECTION, subject_id).await? else {
            return Ok(None);
        };
        if !Self::indicates_premium(&hit.doc) {
            return Ok(None);
        }
        Ok(Some(Entitlement {
            subject_id: subject_id.to_string(),
            email: str_field(&hit.doc, "email").map(str::to_string),
            tier: Tier::Premium,
            source: SourceTag::ProviderClaims,
            valid_from: date_field(&hit.doc, "subscription_start"),
            valid_until: date_field(&hit.doc, "subscription_end"),
            quota_override_ms: None,
        }))
    }

    async fn lookup_by_email(&self, _email: &str) -> StoreResult<Option<Entitlement>> {
        // Id-keyed; no email index exists.
        Ok(None)
    }
}

/// The legacy profile store.
///
/// A record present here with a missing or empty status field is a `free`
/// profile — legacy signups predate the limited tier.
pub(crate) struct LegacyProfileSource<S> {
    pub store: S,
}

impl<S: DocumentStore> LegacyProfileSource<S> {
    fn decode(&self, subject_id: &str, doc: &Value) -> Entitlement {
        let status = str_field(doc, "subscription_status").unwrap_or("free");
        Entitlement {
            subject_id: subject_id.to_string(),
            email: str_field(doc, "email").map(str::to_string),
            tier: Tier::normalize(Some(status)),
            source: SourceTag::LegacyProfile,
            valid_from: date_field(doc, "subscription_start"),
            valid_until: date_field(doc, "subscription_end"),
            quota_override_ms: None,
        }
    }
}

#[async_trait]
impl<S: DocumentStore> EntitlementSource for LegacyProfileSource<S> {
    fn tag(&self) -> SourceTag {
        SourceTag::LegacyProfile
    }

    async fn lookup_by_id(&self, subject_id: &str) -> StoreResult<Option<Entitlement>> {
        let hit = self.store.get(LEGACY_COLLECTION, subject_id).await?;
        Ok(hit.map(|v| self.decode(subject_id, &v.doc)))
    }

    async fn lookup_by_email(&self, email: &str) -> StoreResult<Option<Entitlement>> {
        let hits = self
            .store
            .find_by_field(LEGACY_COLLECTION, "email", email, 1)
            .await?;
        Ok(hits.first().map(|(key, v)| self.decode(key, &v.doc)))
    }
}
