//! The resolved, read-only entitlement record.

use crate::{SourceTag, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subject's resolved entitlement.
///
/// Produced fresh on every resolution and never mutated in place;
/// re-resolution replaces it. Carries which source won the precedence scan
/// so callers can log and diagnose stale-source problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// Subject identifier.
    pub subject_id: String,
    /// Subject email, if the winning source recorded one.
    pub email: Option<String>,
    /// Canonical tier after normalization.
    pub tier: Tier,
    /// Which source produced this record.
    pub source: SourceTag,
    /// Subscription validity window start, when the source recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_from: Option<DateTime<Utc>>,
    /// Subscription validity window end, when the source recorded one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<DateTime<Utc>>,
    /// Per-subject daily quota override in milliseconds, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_override_ms: Option<i64>,
}

impl Entitlement {
    /// The daily limit this entitlement grants, honoring a per-subject
    /// override for bounded tiers.
    #[must_use]
    pub fn daily_limit_ms(&self) -> i64 {
        if self.tier.is_unlimited() {
            self.tier.daily_limit_ms()
        } else {
            self.quota_override_ms.unwrap_or_else(|| self.tier.daily_limit_ms())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DAILY_LIMIT_MS;
    use pretty_assertions::assert_eq;

    fn record(tier: Tier, quota_override_ms: Option<i64>) -> Entitlement {
        Entitlement {
            subject_id: "u1".to_string(),
            email: Some("u1@example.com".to_string()),
            tier,
            source: SourceTag::Authoritative,
            valid_from: None,
            valid_until: None,
            quota_override_ms,
        }
    }

    #[test]
    fn premium_ignores_quota_override() {
        assert_eq!(record(Tier::Premium, Some(1)).daily_limit_ms(), -1);
    }

    #[test]
    fn limited_honors_quota_override() {
        assert_eq!(record(Tier::Limited, Some(7_200_000)).daily_limit_ms(), 7_200_000);
        assert_eq!(record(Tier::Limited, None).daily_limit_ms(), DAILY_LIMIT_MS);
    }
}
