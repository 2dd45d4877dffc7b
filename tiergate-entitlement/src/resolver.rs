//! The identity resolver: precedence scan plus profile admin operations.

use crate::error::{ResolveError, ResolveResult};
use crate::sources::{
    AuthoritativeSource, EntitlementSource, LegacyProfileSource, ProviderClaimsSource,
    AUTHORITATIVE_COLLECTION, LEGACY_COLLECTION,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tiergate_store::DocumentStore;
use tiergate_types::{Entitlement, SourceTag, Tier};
use tracing::{debug, warn};

/// The caller-supplied identity hint. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityHint {
    /// Subject identifier, when known.
    pub subject_id: Option<String>,
    /// Subject email, when known.
    pub email: Option<String>,
}

impl IdentityHint {
    /// Hint by subject id.
    #[must_use]
    pub fn by_id(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: Some(subject_id.into()),
            email: None,
        }
    }

    /// Hint by email only.
    #[must_use]
    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            subject_id: None,
            email: Some(email.into()),
        }
    }

    fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Resolves "who is this caller and what are they entitled to" across the
/// three entitlement sources.
///
/// Resolution is a pure read. The telemetry writes
/// ([`Resolver::touch_last_access`],
/// [`Resolver::record_daily_activation`]) are separate operations whose
/// failures are logged and swallowed so they can never fail a caller's
/// request.
pub struct Resolver {
    store: Arc<dyn DocumentStore>,
    sources: Vec<Box<dyn EntitlementSource>>,
}

impl Resolver {
    /// Creates a resolver over the three sources in precedence order.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let sources: Vec<Box<dyn EntitlementSource>> = vec![
            Box::new(AuthoritativeSource { store: store.clone() }),
            Box::new(ProviderClaimsSource { store: store.clone() }),
            Box::new(LegacyProfileSource { store: store.clone() }),
        ];
        Self { store, sources }
    }

    /// Resolves an identity hint to an entitlement record.
    ///
    /// Scans sources in precedence order and returns the first match.
    /// `Ok(None)` means no source knows this subject; callers interpret
    /// that as a default `limited` entitlement (the default itself lives
    /// with the caller so the two policies stay independently testable).
    ///
    /// # Errors
    ///
    /// [`ResolveError::MissingIdentity`] when the hint carries neither a
    /// subject id nor an email. Per-source lookup failures never surface.
    pub async fn resolve(&self, hint: &IdentityHint) -> ResolveResult<Option<Entitlement>> {
        if let Some(subject_id) = hint.subject_id() {
            return Ok(self.scan(subject_id, Lookup::ById, None).await);
        }
        if let Some(email) = hint.email() {
            return Ok(self.scan(email, Lookup::ByEmail, None).await);
        }
        Err(ResolveError::MissingIdentity)
    }

    /// Returns true if the subject resolves to premium, consulting only
    /// the authoritative store and provider claims (the legacy store can
    /// never assert premium on its own in this check).
    pub async fn is_premium(&self, subject_id: &str) -> ResolveResult<bool> {
        let found = self
            .scan(subject_id, Lookup::ById, Some(SourceTag::ProviderClaims))
            .await;
        Ok(found.is_some_and(|e| e.tier == Tier::Premium))
    }

    async fn scan(
        &self,
        needle: &str,
        lookup: Lookup,
        stop_after: Option<SourceTag>,
    ) -> Option<Entitlement> {
        for source in &self.sources {
            if let Some(last) = stop_after {
                if last.outranks(source.tag()) {
                    break;
                }
            }
            let result = match lookup {
                Lookup::ById => source.lookup_by_id(needle).await,
                Lookup::ByEmail => source.lookup_by_email(needle).await,
            };
            match result {
                Ok(Some(entitlement)) => {
                    debug!(
                        source = %source.tag(),
                        tier = %entitlement.tier,
                        "entitlement resolved"
                    );
                    return Some(entitlement);
                }
                Ok(None) => {}
                Err(err) => {
                    // Degraded source: treat as absent and keep scanning.
                    warn!(source = %source.tag(), error = %err, "source lookup failed");
                }
            }
        }
        None
    }

    /// Stamps the subject's last-access time on whichever profile record
    /// exists, preferring the authoritative store.
    ///
    /// Non-critical telemetry: failures are logged and swallowed.
    pub async fn touch_last_access(&self, subject_id: &str, now: DateTime<Utc>) {
        let stamp = json!({
            "last_access": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });
        match self
            .store
            .merge(AUTHORITATIVE_COLLECTION, subject_id, stamp.clone())
            .await
        {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => warn!(error = %err, "last-access update on authoritative store failed"),
        }
        match self.store.merge(LEGACY_COLLECTION, subject_id, stamp).await {
            Ok(_) => {}
            Err(err) => warn!(error = %err, "last-access update on legacy store failed"),
        }
    }

    /// Records a daily activation on the subject's profile: stamps the
    /// authoritative record when one exists, otherwise marks the legacy
    /// profile limited.
    ///
    /// Non-critical telemetry: failures are logged and swallowed.
    pub async fn record_daily_activation(&self, subject_id: &str, now: DateTime<Utc>) {
        let authoritative_stamp = json!({
            "last_daily_activation": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });
        match self
            .store
            .merge(AUTHORITATIVE_COLLECTION, subject_id, authoritative_stamp)
            .await
        {
            Ok(true) => return,
            Ok(false) => {}
            Err(err) => {
                warn!(error = %err, "daily-activation stamp on authoritative store failed");
            }
        }
        let legacy_stamp = json!({
            "subscription_status": Tier::Limited.as_str(),
            "last_daily_activation": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });
        match self.store.merge(LEGACY_COLLECTION, subject_id, legacy_stamp).await {
            Ok(_) => {}
            Err(err) => warn!(error = %err, "daily-activation stamp on legacy store failed"),
        }
    }

    /// Creates a fresh profile in the legacy store.
    ///
    /// New signups always land in the legacy store; promotion into the
    /// authoritative store happens through [`Resolver::set_subscription`].
    pub async fn create_profile(
        &self,
        subject_id: &str,
        email: &str,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> ResolveResult<Entitlement> {
        let doc = json!({
            "subject_id": subject_id,
            "email": email,
            "subscription_status": tier.as_str(),
            "subscription_start": now.to_rfc3339(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });
        self.store.put(LEGACY_COLLECTION, subject_id, doc).await?;
        debug!(subject_id, tier = %tier, "profile created");
        Ok(Entitlement {
            subject_id: subject_id.to_string(),
            email: Some(email.to_string()),
            tier,
            source: SourceTag::LegacyProfile,
            valid_from: Some(now),
            valid_until: None,
            quota_override_ms: None,
        })
    }

    /// Updates a subject's subscription status, preferring the
    /// authoritative store and falling back to the legacy store.
    ///
    /// # Errors
    ///
    /// Surfaces the legacy-store failure when neither store accepted the
    /// update.
    pub async fn set_subscription(
        &self,
        subject_id: &str,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> ResolveResult<SourceTag> {
        let fields = json!({
            "subscription_status": tier.as_str(),
            "updated_at": now.to_rfc3339(),
        });
        match self
            .store
            .merge(AUTHORITATIVE_COLLECTION, subject_id, fields.clone())
            .await
        {
            Ok(true) => return Ok(SourceTag::Authoritative),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "subscription update on authoritative store failed"),
        }
        if self.store.merge(LEGACY_COLLECTION, subject_id, fields).await? {
            Ok(SourceTag::LegacyProfile)
        } else {
            // No profile anywhere: create one so the status sticks.
            self.create_profile(subject_id, "", tier, now).await?;
            Ok(SourceTag::LegacyProfile)
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

#[derive(Clone, Copy)]
enum Lookup {
    ById,
    ByEmail,
}
