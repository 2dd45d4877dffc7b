//! Canonical entitlement tiers and legacy status normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed daily usage allowance for bounded tiers (one hour, in milliseconds).
pub const DAILY_LIMIT_MS: i64 = 3_600_000;

/// Sentinel surfaced to clients for unlimited usage.
pub const UNLIMITED_MS: i64 = -1;

/// The canonical entitlement tier.
///
/// Ordered by capability: `Free < Limited < Premium`. The order is a
/// capability ranking, not a numeric quota relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No extension access.
    Free,
    /// Bounded daily access (one hour per device per day).
    Limited,
    /// Unlimited access.
    Premium,
}

impl Tier {
    /// Normalizes a raw stored status value to a canonical tier.
    ///
    /// This is the single place legacy and unknown values are coerced:
    /// - `"premium"` maps to [`Tier::Premium`]
    /// - `"free"` maps to [`Tier::Free`]
    /// - `"trial"` (deprecated) maps to [`Tier::Limited`]
    /// - `"limited"`, `None`, and anything unrecognized map to
    ///   [`Tier::Limited`]
    ///
    /// Total and idempotent: `normalize(Some(t.as_str())) == t` for every
    /// tier `t` produced by this function.
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("premium") => Self::Premium,
            Some("free") => Self::Free,
            // Deprecated trial marker: trials now get the standard daily hour.
            Some("trial") => Self::Limited,
            _ => Self::Limited,
        }
    }

    /// Returns the canonical string form (round-trips through `normalize`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Limited => "limited",
            Self::Premium => "premium",
        }
    }

    /// Returns true if this tier has no daily usage bound.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Premium)
    }

    /// Returns the daily limit surfaced to clients: [`UNLIMITED_MS`] for
    /// premium, the fixed one-hour allowance otherwise.
    #[must_use]
    pub fn daily_limit_ms(&self) -> i64 {
        if self.is_unlimited() {
            UNLIMITED_MS
        } else {
            DAILY_LIMIT_MS
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
