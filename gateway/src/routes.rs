//! Endpoint handlers.

use crate::wire::{
    ActivateRequest, ActivateResponse, ErrorBody, SessionBlock, SessionStartRequest,
    SessionStartResponse, StatusRequest, StatusResponse,
};
use crate::{AppState, HEARTBEAT_PATH};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tiergate_entitlement::IdentityHint;
use tiergate_quota::{next_reset, Activation};
use tiergate_types::{Entitlement, Tier};
use tracing::{info, warn};

/// `POST /api/extension/activate-daily-use`
pub async fn activate_daily_use(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ActivateRequest>,
) -> Response {
    let (Some(user_id), Some(user_email)) = (non_empty(&req.user_id), non_empty(&req.user_email))
    else {
        return authentication_required();
    };
    let Some(fingerprint) = non_empty(&req.device_fingerprint) else {
        return fingerprint_required();
    };

    let now = Utc::now();
    let resolved = state
        .resolver
        .resolve(&IdentityHint::by_id(user_id))
        .await
        .ok()
        .flatten();
    let tier = effective_tier(&resolved);

    // The ledger only gates bounded tiers; premium bypasses it entirely.
    let resets_at = if tier.is_unlimited() {
        next_reset(now.date_naive())
    } else {
        match state.ledger.activate(fingerprint, user_id, user_email, now).await {
            Ok(Activation::Granted { activation, superseded }) => {
                if superseded {
                    info!(user_id, fingerprint, "daily grant re-activated");
                }
                activation.resets_at()
            }
            Ok(Activation::Rejected { resets_at }) => {
                let mut body = ErrorBody::new(
                    "Daily limit already used",
                    "DAILY_LIMIT_USED",
                    "You have already used your daily hour today. Try again tomorrow.",
                );
                body.next_reset_time = Some(resets_at.to_rfc3339());
                return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
            }
            Err(err) => {
                warn!(error = %err, "daily activation failed");
                return activation_error();
            }
        }
    };

    let subject_id = resolved
        .as_ref()
        .map_or(user_id, |e| e.subject_id.as_str())
        .to_string();
    let email = resolved
        .as_ref()
        .and_then(|e| e.email.clone())
        .unwrap_or_else(|| user_email.to_string());

    let issued = match state
        .issuer
        .issue(
            &subject_id,
            &email,
            tier,
            fingerprint,
            &client_ip(&headers),
            &user_agent(&headers),
            now,
        )
        .await
    {
        Ok(issued) => issued,
        Err(err) => {
            warn!(error = %err, "session issuance failed during activation");
            return activation_error();
        }
    };

    // Best-effort profile telemetry; never fails the request.
    state.resolver.record_daily_activation(&subject_id, now).await;
    info!(user_id, fingerprint, %tier, "daily use activated");

    let response = ActivateResponse {
        success: true,
        activated: true,
        daily_limit: tier.daily_limit_ms(),
        activated_at: now.to_rfc3339(),
        resets_at: resets_at.to_rfc3339(),
        session: SessionBlock {
            session_id: issued.session.session_id.clone(),
            token: issued.token.clone(),
            expires_in: issued.expires_in_secs,
            tier,
            heartbeat_url: heartbeat_url(&state, &headers),
        },
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// `POST /api/extension/auth-status`
///
/// Takes the body as text: the extension sometimes probes with an empty
/// body, which must read as an unauthenticated call, not a parse error.
pub async fn auth_status(State(state): State<AppState>, body: String) -> Response {
    let req: StatusRequest = if body.trim().is_empty() {
        StatusRequest::default()
    } else {
        match serde_json::from_str(&body) {
            Ok(req) => req,
            Err(err) => {
                let body = ErrorBody::new(
                    "Invalid JSON in request body",
                    "INVALID_REQUEST",
                    &err.to_string(),
                );
                return (StatusCode::BAD_REQUEST, Json(body)).into_response();
            }
        }
    };

    let hint = IdentityHint {
        subject_id: req.user_id.clone(),
        email: req.user_email.clone(),
    };
    let resolved = match state.resolver.resolve(&hint).await {
        Ok(found) => found,
        // Unauthenticated probe: hand back the default grant, not an error.
        Err(_) => return (StatusCode::OK, Json(StatusResponse::default_limited())).into_response(),
    };

    let response = match resolved {
        Some(entitlement) => {
            state
                .resolver
                .touch_last_access(&entitlement.subject_id, Utc::now())
                .await;
            StatusResponse::for_tier(entitlement.tier)
        }
        None => StatusResponse::default_limited(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// `POST /api/v2/session/start`
pub async fn session_start(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SessionStartRequest>,
) -> Response {
    let Some(fingerprint) = non_empty(&req.device_fingerprint) else {
        return fingerprint_required();
    };
    let (Some(user_id), Some(email)) = (non_empty(&req.user_id), non_empty(&req.email)) else {
        return authentication_required();
    };

    // By id first, by email as a fallback for subjects whose id changed
    // across the provider migration.
    let mut resolved = state
        .resolver
        .resolve(&IdentityHint::by_id(user_id))
        .await
        .ok()
        .flatten();
    if resolved.is_none() {
        resolved = state
            .resolver
            .resolve(&IdentityHint::by_email(email))
            .await
            .ok()
            .flatten();
    }
    let Some(entitlement) = resolved else {
        let body = ErrorBody::new(
            "User not found",
            "USER_NOT_FOUND",
            "User not found in any data source",
        );
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    let session_email = entitlement.email.clone().unwrap_or_else(|| email.to_string());
    let user_agent = req
        .user_agent
        .clone()
        .unwrap_or_else(|| self::user_agent(&headers));
    let issued = match state
        .issuer
        .issue(
            &entitlement.subject_id,
            &session_email,
            entitlement.tier,
            fingerprint,
            &client_ip(&headers),
            &user_agent,
            Utc::now(),
        )
        .await
    {
        Ok(issued) => issued,
        Err(err) => {
            warn!(error = %err, "session issuance failed");
            let body = ErrorBody::new(
                "Failed to start session",
                "SESSION_START_ERROR",
                "Could not create a session",
            );
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };

    info!(
        subject_id = %entitlement.subject_id,
        tier = %entitlement.tier,
        source = %entitlement.source,
        "session started"
    );
    let response = SessionStartResponse {
        success: true,
        session_id: issued.session.session_id.clone(),
        token: issued.token.clone(),
        expires_in: issued.expires_in_secs,
        tier: entitlement.tier,
        daily_limit: entitlement.daily_limit_ms(),
        source: entitlement.source,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Query parameters for the diagnostics route.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugQuery {
    pub user_id: Option<String>,
    pub email: Option<String>,
}

/// `GET /api/debug/entitlement` — only mounted when diagnostics are
/// enabled.
pub async fn debug_entitlement(
    State(state): State<AppState>,
    Query(query): Query<DebugQuery>,
) -> Response {
    if non_empty(&query.user_id).is_none() && non_empty(&query.email).is_none() {
        let body = ErrorBody::new(
            "userId or email parameter required",
            "INVALID_REQUEST",
            "Supply userId or email",
        );
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }
    let hint = IdentityHint {
        subject_id: query.user_id,
        email: query.email,
    };
    let report = state.resolver.inspect(&hint).await;
    (StatusCode::OK, Json(report)).into_response()
}

/// `POST /api/debug/clear-premium-claims?userId=` — strips stale
/// subscription markers from the claims record. Only mounted when
/// diagnostics are enabled.
pub async fn clear_premium_claims(
    State(state): State<AppState>,
    Query(query): Query<DebugQuery>,
) -> Response {
    let Some(user_id) = non_empty(&query.user_id) else {
        let body = ErrorBody::new(
            "userId parameter required",
            "INVALID_REQUEST",
            "Supply userId",
        );
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };
    match state.resolver.clear_premium_claims(user_id).await {
        Ok(removed) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "userId": user_id,
                "removedClaims": removed,
            })),
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, "failed to clear premium claims");
            let body = ErrorBody::new(
                "Failed to clear premium claims",
                "CLAIMS_CLEAR_ERROR",
                "Could not update the claims record",
            );
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn effective_tier(resolved: &Option<Entitlement>) -> Tier {
    // Absence of any record defaults to limited, never premium.
    resolved.as_ref().map_or(Tier::Limited, |e| e.tier)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn authentication_required() -> Response {
    let body = ErrorBody::new(
        "Authentication required",
        "AUTHENTICATION_REQUIRED",
        "Please sign in to use the extension",
    );
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

fn fingerprint_required() -> Response {
    let body = ErrorBody::new(
        "Device fingerprint required",
        "DEVICE_FINGERPRINT_REQUIRED",
        "A device fingerprint is required",
    );
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn activation_error() -> Response {
    let body = ErrorBody::new(
        "Failed to activate daily use",
        "ACTIVATION_ERROR",
        "Could not activate daily use",
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Client address from proxy headers, `unknown` when absent.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .unwrap_or("unknown")
        .to_string()
}

fn user_agent(headers: &HeaderMap) -> String {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

fn heartbeat_url(state: &AppState, headers: &HeaderMap) -> String {
    let origin = headers
        .get("origin")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.public_origin);
    format!("{origin}{HEARTBEAT_PATH}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "198.51.100.2");
        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }

    #[test]
    fn free_tier_status_denies_use() {
        let response = StatusResponse::for_tier(Tier::Free);
        assert!(!response.can_use);
        assert_eq!(response.time_remaining_ms, 0);
    }
}
