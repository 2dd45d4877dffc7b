//! Entitlement data source tags and their precedence order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backing data source produced a resolved entitlement record.
///
/// Precedence is a strict total order:
/// `Authoritative > ProviderClaims > LegacyProfile`. Once a subject is found
/// in a higher-precedence source, lower sources are never consulted; the
/// early return is what prevents stale provider claims from overriding a
/// fresher authoritative record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// The authoritative subscription store (`premium_users` collection).
    Authoritative,
    /// Identity-provider custom claims (id-keyed, not queryable by email).
    ProviderClaims,
    /// The legacy profile store (`users` collection), kept for migration
    /// history.
    LegacyProfile,
}

impl SourceTag {
    /// Precedence rank; lower wins.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Authoritative => 0,
            Self::ProviderClaims => 1,
            Self::LegacyProfile => 2,
        }
    }

    /// Returns true if this source outranks `other`.
    #[must_use]
    pub fn outranks(&self, other: SourceTag) -> bool {
        self.rank() < other.rank()
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Authoritative => "authoritative",
            Self::ProviderClaims => "provider_claims",
            Self::LegacyProfile => "legacy_profile",
        };
        f.write_str(s)
    }
}
