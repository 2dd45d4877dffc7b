//! Request and response bodies for the extension-facing API.
//!
//! Field names are camelCase on the wire; the deployed extension already
//! speaks this shape (including the `userEmail` vs `email` difference
//! between the activation and session-start endpoints).

use serde::{Deserialize, Serialize};
use tiergate_types::{SourceTag, Tier};

/// `POST /api/extension/activate-daily-use` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivateRequest {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub device_fingerprint: Option<String>,
}

/// Session block embedded in activation and session-start responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBlock {
    pub session_id: String,
    pub token: String,
    /// Credential lifetime in seconds.
    pub expires_in: i64,
    pub tier: Tier,
    pub heartbeat_url: String,
}

/// `POST /api/extension/activate-daily-use` success response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateResponse {
    pub success: bool,
    pub activated: bool,
    /// Daily allowance in milliseconds; `-1` for unlimited tiers.
    pub daily_limit: i64,
    /// ISO timestamp of this activation.
    pub activated_at: String,
    /// ISO timestamp of the next daily reset boundary.
    pub resets_at: String,
    pub session: SessionBlock,
}

/// `POST /api/extension/auth-status` request. Every field is optional; an
/// empty or missing body is a valid unauthenticated probe.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusRequest {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

/// `POST /api/extension/auth-status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub tier: Tier,
    pub can_use: bool,
    pub reason: String,
    /// `-1` for unlimited; milliseconds otherwise.
    pub time_remaining_ms: i64,
    pub has_premium_feature: bool,
}

impl StatusResponse {
    /// The description handed to unauthenticated or unknown callers: the
    /// default `limited` grant, never an error and never `premium`.
    #[must_use]
    pub fn default_limited() -> Self {
        Self {
            tier: Tier::Limited,
            can_use: true,
            reason: "limited_daily_access".to_string(),
            time_remaining_ms: Tier::Limited.daily_limit_ms(),
            has_premium_feature: false,
        }
    }

    /// The description for a resolved tier.
    #[must_use]
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Premium => Self {
                tier,
                can_use: true,
                reason: "premium_unlimited".to_string(),
                time_remaining_ms: tier.daily_limit_ms(),
                has_premium_feature: true,
            },
            Tier::Limited => Self {
                tier,
                can_use: true,
                reason: "limited_daily_access".to_string(),
                time_remaining_ms: tier.daily_limit_ms(),
                has_premium_feature: false,
            },
            Tier::Free => Self {
                tier,
                can_use: false,
                reason: "subscription_required".to_string(),
                time_remaining_ms: 0,
                has_premium_feature: false,
            },
        }
    }
}

/// `POST /api/v2/session/start` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionStartRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub device_fingerprint: Option<String>,
    pub user_agent: Option<String>,
}

/// `POST /api/v2/session/start` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartResponse {
    pub success: bool,
    pub session_id: String,
    pub token: String,
    /// Credential lifetime in seconds.
    pub expires_in: i64,
    pub tier: Tier,
    /// Daily allowance in milliseconds; `-1` for unlimited tiers.
    pub daily_limit: i64,
    /// Which source resolved the caller.
    pub source: SourceTag,
}

/// Machine-readable error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub message: String,
    /// Next daily reset, present only on quota rejections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_reset_time: Option<String>,
}

impl ErrorBody {
    #[must_use]
    pub fn new(error: &str, code: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
            message: message.to_string(),
            next_reset_time: None,
        }
    }
}
