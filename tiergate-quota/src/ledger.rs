//! Ledger records and the activation state machine.

use crate::error::{QuotaError, QuotaResult};
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiergate_store::DocumentStore;
use tiergate_types::DAILY_LIMIT_MS;
use tracing::{debug, warn};

/// Daily-activation ledger collection, keyed by `{fingerprint}_{date}`.
pub const LEDGER_COLLECTION: &str = "daily_limits";

/// How many times a lost conditional write is retried before giving up.
const MAX_ATTEMPTS: u32 = 4;

/// One device's activation record for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyActivation {
    /// The device the grant is bound to.
    pub device_fingerprint: String,
    /// UTC calendar day of the grant.
    pub date: NaiveDate,
    /// Subject holding the grant.
    pub subject_id: String,
    /// Subject email at activation time.
    pub email: String,
    /// When the grant was (last) activated.
    pub activated_at: DateTime<Utc>,
    /// Usage allowance for the day, in milliseconds.
    pub usage_limit_ms: i64,
    /// Whether the grant is active.
    pub activated: bool,
}

impl DailyActivation {
    /// Ledger key for a device/day pair.
    #[must_use]
    pub fn key(device_fingerprint: &str, date: NaiveDate) -> String {
        format!("{device_fingerprint}_{}", date.format("%Y-%m-%d"))
    }

    /// True if `subject_id` and `email` both match the grant holder.
    #[must_use]
    pub fn held_by(&self, subject_id: &str, email: &str) -> bool {
        self.subject_id == subject_id && self.email == email
    }

    /// Start of the next UTC calendar day after this grant's day.
    #[must_use]
    pub fn resets_at(&self) -> DateTime<Utc> {
        next_reset(self.date)
    }
}

/// Outcome of an activation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// The grant was issued (or re-issued to the same subject).
    Granted {
        /// The activation record as written.
        activation: DailyActivation,
        /// True when an existing grant by the same subject was superseded.
        superseded: bool,
    },
    /// Another subject already holds the device's grant for the day.
    Rejected {
        /// When the device's quota resets (start of next UTC day).
        resets_at: DateTime<Utc>,
    },
}

/// The per-device daily quota ledger.
pub struct QuotaLedger {
    store: Arc<dyn DocumentStore>,
    usage_limit_ms: i64,
}

impl QuotaLedger {
    /// Creates a ledger granting the standard one-hour daily allowance.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            usage_limit_ms: DAILY_LIMIT_MS,
        }
    }

    /// Overrides the per-day allowance (used by tests and staged rollouts).
    #[must_use]
    pub fn with_usage_limit(mut self, usage_limit_ms: i64) -> Self {
        self.usage_limit_ms = usage_limit_ms;
        self
    }

    /// Attempts to activate daily use for a device.
    ///
    /// State machine per `(device, day)` key:
    /// `NoRecord -> Granted(S)`; `Granted(S) -> Granted(S)` for the same
    /// subject (supersede); `Granted(S) -> Rejected` for any other subject.
    ///
    /// # Errors
    ///
    /// [`QuotaError::Contention`] when conditional writes kept losing,
    /// [`QuotaError::Store`] when the backend failed.
    pub async fn activate(
        &self,
        device_fingerprint: &str,
        subject_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> QuotaResult<Activation> {
        let date = now.date_naive();
        let key = DailyActivation::key(device_fingerprint, date);
        let fresh = DailyActivation {
            device_fingerprint: device_fingerprint.to_string(),
            date,
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            activated_at: now,
            usage_limit_ms: self.usage_limit_ms,
            activated: true,
        };
        let fresh_doc = serde_json::to_value(&fresh)?;

        for attempt in 0..MAX_ATTEMPTS {
            match self.store.get(LEDGER_COLLECTION, &key).await? {
                None => {
                    if self.store.insert(LEDGER_COLLECTION, &key, fresh_doc.clone()).await? {
                        debug!(device = device_fingerprint, %date, "daily grant issued");
                        return Ok(Activation::Granted {
                            activation: fresh,
                            superseded: false,
                        });
                    }
                    // Another activation created the record first; re-read
                    // and evaluate it.
                }
                Some(existing) => {
                    let record: DailyActivation = serde_json::from_value(existing.doc)?;
                    if record.activated && !record.held_by(subject_id, email) {
                        debug!(
                            device = device_fingerprint,
                            %date,
                            "daily grant held by another subject"
                        );
                        return Ok(Activation::Rejected {
                            resets_at: next_reset(date),
                        });
                    }
                    // Same subject (idempotent re-entry) or a dead record:
                    // supersede, conditional on the version we read.
                    if self
                        .store
                        .replace(LEDGER_COLLECTION, &key, existing.version, fresh_doc.clone())
                        .await?
                    {
                        debug!(device = device_fingerprint, %date, "daily grant superseded");
                        return Ok(Activation::Granted {
                            activation: fresh,
                            superseded: record.activated,
                        });
                    }
                }
            }
            warn!(
                device = device_fingerprint,
                attempt, "activation write lost a race, retrying"
            );
        }
        Err(QuotaError::Contention)
    }

    /// Reads the device's activation record for the day of `now`, if any.
    pub async fn peek(
        &self,
        device_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> QuotaResult<Option<DailyActivation>> {
        let key = DailyActivation::key(device_fingerprint, now.date_naive());
        match self.store.get(LEDGER_COLLECTION, &key).await? {
            Some(v) => Ok(Some(serde_json::from_value(v.doc)?)),
            None => Ok(None),
        }
    }
}

/// Start of the UTC day after `date` (the daily reset boundary).
pub fn next_reset(date: NaiveDate) -> DateTime<Utc> {
    let next = date
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX);
    next.and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}
