//! Session issuance and signed credentials.
//!
//! A successful activation or session-start binds the resolved entitlement
//! to a persisted session record plus a signed, expiring credential the
//! extension presents on subsequent calls.
//!
//! # Credential format
//!
//! Credentials are `base64url(payload).base64url(signature)`; the payload
//! is a JSON claims object signed with Ed25519 over the encoded-payload
//! bytes. The embedded tier is a cached decision valid for the credential's
//! fixed 2-hour TTL — verification never re-resolves entitlement.
//!
//! There is no server-side revocation list; credentials expire on their
//! own. Immediate revocation on downgrade would need a session-id denylist
//! consulted by the verification step.

mod credential;
mod error;
mod session;

pub use credential::{CredentialClaims, CredentialSigner, CREDENTIAL_TTL_SECS};
pub use error::{SessionError, SessionResult};
pub use session::{IssuedSession, Session, SessionIssuer, SessionStatus, SESSIONS_COLLECTION};
