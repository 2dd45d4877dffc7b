//! Session records and the issuer.

use crate::credential::{CredentialClaims, CredentialSigner, CREDENTIAL_TTL_SECS};
use crate::error::SessionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiergate_store::DocumentStore;
use tiergate_types::Tier;
use tracing::debug;
use uuid::Uuid;

/// Session store collection, keyed by session id.
pub const SESSIONS_COLLECTION: &str = "sessions";

/// Session lifecycle status. Terminal once it leaves `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The session is live; the heartbeat collaborator advances it.
    Active,
    /// The session aged out.
    Expired,
    /// The session was revoked.
    Revoked,
}

/// A persisted extension session.
///
/// Created atomically with credential issuance; mutated afterwards only by
/// the (external) heartbeat collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier.
    pub session_id: String,
    /// Subject holding the session.
    pub subject_id: String,
    /// Subject email.
    pub email: String,
    /// Tier resolved at issuance.
    pub tier: Tier,
    /// Device the session is bound to.
    pub device_fingerprint: String,
    /// Remote address at issuance.
    pub remote_addr: String,
    /// Client user agent.
    pub user_agent: String,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// Last observed client activity.
    pub last_activity: DateTime<Utc>,
    /// Last heartbeat receipt.
    pub last_heartbeat: DateTime<Utc>,
    /// Accumulated usage in milliseconds.
    pub cumulative_usage_ms: i64,
    /// Number of heartbeats received.
    pub heartbeat_count: u64,
    /// Lifecycle status.
    pub status: SessionStatus,
}

/// The session plus its signed credential, returned as an inseparable pair.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The persisted session record.
    pub session: Session,
    /// The signed credential token.
    pub token: String,
    /// Credential lifetime in seconds.
    pub expires_in_secs: i64,
}

impl IssuedSession {
    /// The daily limit to surface to the client: `-1` for premium, the
    /// fixed one-hour allowance otherwise.
    #[must_use]
    pub fn daily_limit_ms(&self) -> i64 {
        self.session.tier.daily_limit_ms()
    }
}

/// Creates session records and signs their credentials.
pub struct SessionIssuer {
    store: Arc<dyn DocumentStore>,
    signer: CredentialSigner,
}

impl SessionIssuer {
    /// Creates an issuer over the given store and signing key.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, signer: CredentialSigner) -> Self {
        Self { store, signer }
    }

    /// The verifying key for the credential-check collaborator.
    #[must_use]
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.signer.verifying_key_bytes()
    }

    /// Issues a session for a resolved entitlement.
    ///
    /// Persists the session record with `status = Active` and zeroed
    /// counters, then signs a credential embedding the resolved tier with
    /// the fixed 2-hour TTL.
    ///
    /// # Errors
    ///
    /// Any persistence failure is fatal to the call; no partial
    /// session/credential pair is returned.
    #[allow(clippy::too_many_arguments)]
    pub async fn issue(
        &self,
        subject_id: &str,
        email: &str,
        tier: Tier,
        device_fingerprint: &str,
        remote_addr: &str,
        user_agent: &str,
        now: DateTime<Utc>,
    ) -> SessionResult<IssuedSession> {
        let session_id = new_session_id(subject_id, now);
        let session = Session {
            session_id: session_id.clone(),
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            tier,
            device_fingerprint: device_fingerprint.to_string(),
            remote_addr: remote_addr.to_string(),
            user_agent: user_agent.to_string(),
            started_at: now,
            last_activity: now,
            last_heartbeat: now,
            cumulative_usage_ms: 0,
            heartbeat_count: 0,
            status: SessionStatus::Active,
        };

        self.store
            .put(SESSIONS_COLLECTION, &session_id, serde_json::to_value(&session)?)
            .await?;

        let claims = CredentialClaims {
            session_id: session_id.clone(),
            sub: subject_id.to_string(),
            device_fingerprint: device_fingerprint.to_string(),
            remote_addr: remote_addr.to_string(),
            tier,
            iat: now.timestamp(),
            exp: now.timestamp() + CREDENTIAL_TTL_SECS,
        };
        let token = self.signer.sign(&claims)?;
        debug!(session_id, tier = %tier, "session issued");

        Ok(IssuedSession {
            session,
            token,
            expires_in_secs: CREDENTIAL_TTL_SECS,
        })
    }

    /// Fetches a persisted session record.
    pub async fn get(&self, session_id: &str) -> SessionResult<Option<Session>> {
        match self.store.get(SESSIONS_COLLECTION, session_id).await? {
            Some(v) => Ok(Some(serde_json::from_value(v.doc)?)),
            None => Ok(None),
        }
    }
}

/// Session ids are unique per (subject, instant): timestamp plus a random
/// suffix makes collisions negligible even for same-millisecond issuance.
fn new_session_id(subject_id: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "auth_{subject_id}_{}_{}",
        now.timestamp_millis(),
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique_for_same_instant() {
        let now = Utc::now();
        let a = new_session_id("u1", now);
        let b = new_session_id("u1", now);
        assert_ne!(a, b);
        assert!(a.starts_with("auth_u1_"));
    }
}
