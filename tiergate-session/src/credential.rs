//! Signed credential encoding and verification.
//!
//! Tokens use the format `base64url(payload).base64url(signature)` with the
//! signature covering the base64url-encoded payload bytes (not the decoded
//! JSON).

use crate::error::{SessionError, SessionResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tiergate_types::Tier;

/// Fixed credential lifetime: 2 hours, regardless of tier.
pub const CREDENTIAL_TTL_SECS: i64 = 2 * 60 * 60;

/// The claims embedded in a signed credential.
///
/// Immutable once issued. `tier` is the entitlement decision cached at
/// issuance; it is never re-derived from the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Session this credential is bound to.
    pub session_id: String,
    /// Subject identifier.
    pub sub: String,
    /// Device the session was started from.
    pub device_fingerprint: String,
    /// Remote address at issuance.
    pub remote_addr: String,
    /// Resolved tier at issuance.
    pub tier: Tier,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

impl CredentialClaims {
    /// Parses and verifies a token against `pub_key_bytes`, enforcing
    /// expiry at `now`.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidToken`] on format problems,
    /// [`SessionError::InvalidSignature`] when verification fails, and
    /// [`SessionError::Expired`] when `now` is at or past `exp`.
    pub fn verify(
        token: &str,
        pub_key_bytes: &[u8; 32],
        now: DateTime<Utc>,
    ) -> SessionResult<Self> {
        let token = token.trim();
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 2 {
            return Err(SessionError::InvalidToken(
                "token must have exactly two parts separated by a dot".to_string(),
            ));
        }
        let payload_b64 = parts[0];
        let signature_b64 = parts[1];

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| SessionError::InvalidToken(format!("invalid signature base64: {e}")))?;
        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| SessionError::InvalidToken("invalid signature length".to_string()))?;

        let verifying_key = VerifyingKey::from_bytes(pub_key_bytes)
            .map_err(|_| SessionError::InvalidToken("invalid public key".to_string()))?;

        verifying_key
            .verify(payload_b64.as_bytes(), &signature)
            .map_err(|_| SessionError::InvalidSignature)?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| SessionError::InvalidToken(format!("invalid payload base64: {e}")))?;
        let claims: Self = serde_json::from_slice(&payload_json)?;

        if now.timestamp() >= claims.exp {
            let expired_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
                .map_or_else(|| claims.exp.to_string(), |dt| dt.to_rfc3339());
            return Err(SessionError::Expired(expired_at));
        }
        Ok(claims)
    }
}

/// Signs credentials with an Ed25519 key.
pub struct CredentialSigner {
    signing_key: SigningKey,
}

impl CredentialSigner {
    /// Wraps an existing signing key.
    #[must_use]
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    /// Derives a signing key from arbitrary seed material (SHA-256
    /// stretched to 32 bytes). Deterministic: the same seed yields the
    /// same key pair.
    #[must_use]
    pub fn from_seed(seed: &[u8]) -> Self {
        let digest = Sha256::digest(seed);
        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&digest);
        Self {
            signing_key: SigningKey::from_bytes(&key_bytes),
        }
    }

    /// The public verifying key, for the external verification step.
    #[must_use]
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Encodes and signs a claims object into a token.
    pub fn sign(&self, claims: &CredentialClaims) -> SessionResult<String> {
        let payload_json = serde_json::to_vec(claims)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);
        let signature = self.signing_key.sign(payload_b64.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
        Ok(format!("{payload_b64}.{sig_b64}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signer() -> CredentialSigner {
        CredentialSigner::from_seed(b"test-seed")
    }

    fn claims(now: DateTime<Utc>) -> CredentialClaims {
        CredentialClaims {
            session_id: "auth_u1_1_abcd1234".to_string(),
            sub: "u1".to_string(),
            device_fingerprint: "fp-1".to_string(),
            remote_addr: "203.0.113.9".to_string(),
            tier: Tier::Limited,
            iat: now.timestamp(),
            exp: now.timestamp() + CREDENTIAL_TTL_SECS,
        }
    }

    #[test]
    fn sign_verify_round_trip() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let signer = signer();
        let token = signer.sign(&claims(now)).unwrap();
        let verified =
            CredentialClaims::verify(&token, &signer.verifying_key_bytes(), now).unwrap();
        assert_eq!(verified, claims(now));
    }

    #[test]
    fn expired_token_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap();
        let signer = signer();
        let token = signer.sign(&claims(now)).unwrap();
        let later = now + chrono::Duration::seconds(CREDENTIAL_TTL_SECS);
        let err = CredentialClaims::verify(&token, &signer.verifying_key_bytes(), later)
            .unwrap_err();
        assert!(matches!(err, SessionError::Expired(_)));
    }

    #[test]
    fn wrong_key_rejected() {
        let now = Utc::now();
        let token = signer().sign(&claims(now)).unwrap();
        let other = CredentialSigner::from_seed(b"other-seed");
        let err =
            CredentialClaims::verify(&token, &other.verifying_key_bytes(), now).unwrap_err();
        assert!(matches!(err, SessionError::InvalidSignature));
    }

    #[test]
    fn garbage_token_rejected() {
        let now = Utc::now();
        let key = signer().verifying_key_bytes();
        for bad in ["", "onlyonepart", "a.b.c", "!!.!!"] {
            assert!(CredentialClaims::verify(bad, &key, now).is_err());
        }
    }

    #[test]
    fn tampered_payload_rejected() {
        let now = Utc::now();
        let signer = signer();
        let token = signer.sign(&claims(now)).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let mut forged = claims(now);
        forged.tier = Tier::Premium;
        let forged_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{forged_b64}.{sig}");
        let err = CredentialClaims::verify(&tampered, &signer.verifying_key_bytes(), now)
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSignature));
    }
}
