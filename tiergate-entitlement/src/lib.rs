//! Source-precedence entitlement resolution.
//!
//! Identity and subscription facts live in three independently-writable
//! sources, a leftover of the payment-system migration:
//!
//! 1. the authoritative subscription store (`premium_users`)
//! 2. identity-provider custom claims (id-keyed)
//! 3. the legacy profile store (`users`)
//!
//! The resolver reconciles them with a strict precedence scan: once a
//! higher-precedence source matches, lower sources are never consulted.
//! That early return is a correctness invariant, not an optimization — a
//! stale premium claim written before a subject was demoted in the
//! authoritative store must not resurrect the old tier.
//!
//! Per-source lookup failures degrade gracefully: they are logged and the
//! scan continues to the next source. Only "no source matched" reaches the
//! caller, as `Ok(None)`; downstream policy maps that to `limited`, never
//! `premium`.

mod diagnostics;
mod error;
mod resolver;
mod sources;

pub use diagnostics::{SourcePresence, SourceReport};
pub use error::{ResolveError, ResolveResult};
pub use resolver::{IdentityHint, Resolver};
pub use sources::{AUTHORITATIVE_COLLECTION, CLAIMS_COLLECTION, LEGACY_COLLECTION};
