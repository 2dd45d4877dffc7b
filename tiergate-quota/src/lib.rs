//! Per-device daily quota ledger.
//!
//! Bounded tiers get one activation grant per device per UTC calendar day.
//! The ledger enforces the at-most-one-active-grant invariant under
//! concurrent activation attempts:
//!
//! - the first activation of a `(device, day)` key wins via an atomic
//!   create-if-absent write
//! - the same subject re-activating supersedes its own grant (idempotent
//!   re-entry, for legitimate re-authentication flows)
//! - a different subject hitting an activated key is rejected with a hint
//!   pointing at the next reset boundary
//!
//! Every read-evaluate-write cycle is closed with a compare-and-swap on the
//! document version, never a bare read-then-write pair; two racers can
//! never both observe "no record" and both succeed.

mod error;
mod ledger;

pub use error::{QuotaError, QuotaResult};
pub use ledger::{next_reset, Activation, DailyActivation, QuotaLedger, LEDGER_COLLECTION};
