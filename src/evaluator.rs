//! Expiration evaluation.
//!
//! Classifies a certificate's validity interval against the current time and
//! the configured thresholds. Everything in here is pure: the clock is passed
//! in, so results are fully deterministic.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::config::Thresholds;
use crate::status::StatusLevel;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// The `[not_before, not_after]` range a certificate is valid for.
///
/// A malformed certificate may carry `not_after < not_before`; that is kept
/// as-is and handled by [`evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityInterval {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

impl ValidityInterval {
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        ValidityInterval {
            not_before,
            not_after,
        }
    }
}

/// Outcome of evaluating one certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub status: StatusLevel,
    /// Fractional days until `not_after`, negative once expired
    pub days_remaining: f64,
    pub message: String,
    pub not_after: DateTime<Utc>,
    /// Only set when the certificate is not yet valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_valid_until: Option<DateTime<Utc>>,
}

/// Classifies `interval` at instant `now`.
///
/// The checks run in a fixed order: not yet valid, already expired, then the
/// critical threshold before the warning threshold. Both threshold checks are
/// inclusive, so a certificate with exactly `critical_days` left is CRITICAL
/// and one with exactly `warning_days` left is WARNING.
pub fn evaluate(
    interval: &ValidityInterval,
    now: DateTime<Utc>,
    thresholds: &Thresholds,
) -> EvaluationResult {
    let remaining = interval.not_after - now;
    let days_remaining = duration_to_days(remaining);

    if now < interval.not_before {
        return EvaluationResult {
            status: StatusLevel::Critical,
            days_remaining,
            message: format!(
                "Certificate is not yet valid, valid from {}",
                format_timestamp(&interval.not_before)
            ),
            not_after: interval.not_after,
            not_valid_until: Some(interval.not_before),
        };
    }

    if now > interval.not_after {
        return EvaluationResult {
            status: StatusLevel::Critical,
            days_remaining,
            message: format!(
                "Certificate is no longer valid, expired {}",
                format_timestamp(&interval.not_after)
            ),
            not_after: interval.not_after,
            not_valid_until: None,
        };
    }

    let status = if remaining <= thresholds.critical() {
        StatusLevel::Critical
    } else if remaining <= thresholds.warning() {
        StatusLevel::Warning
    } else {
        StatusLevel::Ok
    };

    EvaluationResult {
        status,
        days_remaining,
        message: format!("Certificate expires in {:.1} days", days_remaining),
        not_after: interval.not_after,
        not_valid_until: None,
    }
}

/// Converts a duration to fractional days, keeping microsecond precision.
pub fn duration_to_days(duration: TimeDelta) -> f64 {
    let seconds = match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1000.0,
    };
    seconds / SECONDS_PER_DAY
}

/// Timestamp format used in status lines and messages.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}
