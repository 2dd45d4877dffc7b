//! Shared types for the tiergate entitlement service.
//!
//! This crate defines the canonical vocabulary the rest of the workspace
//! speaks:
//! - [`Tier`]: the canonical entitlement level, plus the single place raw
//!   stored status strings (including deprecated ones) are coerced
//! - [`SourceTag`]: which backing data source produced a resolved record,
//!   with a strict precedence order
//! - [`Entitlement`]: the read-only resolved view of a subject's entitlement
//!
//! # Defaulting rules
//!
//! Two deliberately separate policies govern missing data:
//! - Absence of any record anywhere defaults to `limited`, never `premium`
//!   (entitlement must never default upward).
//! - A record *present* in the authoritative subscription store whose status
//!   field is missing defaults to `premium` ("presence implies premium").
//!
//! Both are preserved exactly as found in the production data; unifying them
//! would silently change entitlement outcomes for existing subjects.

mod entitlement;
mod source;
mod tier;

pub use entitlement::Entitlement;
pub use source::SourceTag;
pub use tier::{Tier, DAILY_LIMIT_MS, UNLIMITED_MS};
