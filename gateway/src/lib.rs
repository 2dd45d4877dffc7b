//! HTTP gateway for the tiergate entitlement service.
//!
//! Thin handlers over the core crates: the resolver, the daily quota
//! ledger, and the session issuer do the real work; this layer validates
//! input, maps outcomes to status codes, and keeps internal source detail
//! out of unauthenticated responses.

pub mod routes;
pub mod wire;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tiergate_entitlement::Resolver;
use tiergate_quota::QuotaLedger;
use tiergate_session::{CredentialSigner, SessionIssuer};
use tiergate_store::DocumentStore;

/// Path the heartbeat collaborator listens on, appended to the public
/// origin when building the session block.
pub const HEARTBEAT_PATH: &str = "/api/v2/session/heartbeat";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Identity resolver over the three entitlement sources.
    pub resolver: Arc<Resolver>,
    /// Per-device daily quota ledger.
    pub ledger: Arc<QuotaLedger>,
    /// Session issuer and credential signer.
    pub issuer: Arc<SessionIssuer>,
    /// Origin used for absolute URLs in responses.
    pub public_origin: String,
}

impl AppState {
    /// Wires the core components over one document store.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        signer: CredentialSigner,
        public_origin: String,
    ) -> Self {
        Self {
            resolver: Arc::new(Resolver::new(store.clone())),
            ledger: Arc::new(QuotaLedger::new(store.clone())),
            issuer: Arc::new(SessionIssuer::new(store, signer)),
            public_origin,
        }
    }
}

/// Builds the API router.
///
/// The diagnostics route is only mounted when explicitly enabled; it
/// exposes per-source lookup detail that must never be reachable in a
/// default deployment.
pub fn build_router(state: AppState, enable_diagnostics: bool) -> Router {
    let mut router = Router::new()
        .route("/api/extension/activate-daily-use", post(routes::activate_daily_use))
        .route("/api/extension/auth-status", post(routes::auth_status))
        .route("/api/v2/session/start", post(routes::session_start));
    if enable_diagnostics {
        router = router
            .route("/api/debug/entitlement", get(routes::debug_entitlement))
            .route(
                "/api/debug/clear-premium-claims",
                post(routes::clear_premium_claims),
            );
    }
    router.with_state(state)
}
