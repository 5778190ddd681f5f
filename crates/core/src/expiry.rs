//! Expiry date calculation.

use chrono::{DateTime, Duration, Utc};

use crate::exclusion::is_excluded;
use crate::policy::Policy;
use crate::visit::Visit;

/// Explicit renewal overrides supplied by a caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryOverride {
    /// Number of days to add to the reference time
    pub days: Option<u32>,
    /// Absolute expiry (UTC), wins over `days`
    pub date: Option<DateTime<Utc>>,
}

impl ExpiryOverride {
    pub fn days(days: u32) -> Self {
        Self {
            days: Some(days),
            date: None,
        }
    }

    pub fn date(date: DateTime<Utc>) -> Self {
        Self {
            days: None,
            date: Some(date),
        }
    }
}

/// Computes an expiry timestamp.
///
/// Priority: explicit date, then explicit day count added to `reference`,
/// then the policy retention added to `reference`.
pub fn compute_expiry(
    reference: DateTime<Utc>,
    retention_days: u32,
    overrides: ExpiryOverride,
) -> DateTime<Utc> {
    if let Some(date) = overrides.date {
        return date;
    }
    let days = overrides.days.unwrap_or(retention_days);
    add_days(reference, days)
}

/// Expiry of a freshly created dataset: visit start plus retention, or
/// none when the dataset is excluded from expiry.
pub fn initial_expiry(visit: &Visit, policy: &Policy) -> Option<DateTime<Utc>> {
    if is_excluded(visit, policy) {
        None
    } else {
        Some(compute_expiry(
            visit.start_date,
            policy.retention,
            ExpiryOverride::default(),
        ))
    }
}

fn add_days(reference: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    reference
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
