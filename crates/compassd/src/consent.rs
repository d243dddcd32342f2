//! Consent gate.
//!
//! First blocker on the request path: nothing is sanitised, cached, or
//! sent to a provider unless recorded consent admits the request.
//! Denial is deterministic and final for the request.

use chrono::{DateTime, Months, Utc};
use compass_common::Session;

/// Outcome of the consent check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Consent was never given
    NotGiven,
    /// Consent flag set but capture time missing
    MissingTimestamp,
    /// Consent older than the configured maximum age
    Stale,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotGiven => "consent_not_given",
            DenyReason::MissingTimestamp => "consent_timestamp_missing",
            DenyReason::Stale => "consent_stale",
        }
    }
}

/// Pure check against the wall clock.
pub fn admit(session: &Session, max_age_months: u32) -> Admission {
    admit_at(session, max_age_months, Utc::now())
}

/// Pure check against an explicit clock, for deterministic tests.
pub fn admit_at(session: &Session, max_age_months: u32, now: DateTime<Utc>) -> Admission {
    if !session.consent_given {
        return Admission::Deny(DenyReason::NotGiven);
    }

    let Some(captured_at) = session.consent_timestamp else {
        return Admission::Deny(DenyReason::MissingTimestamp);
    };

    match now.checked_sub_months(Months::new(max_age_months)) {
        Some(cutoff) if captured_at < cutoff => Admission::Deny(DenyReason::Stale),
        _ => Admission::Allow,
    }
}
