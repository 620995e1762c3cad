//! Certificate expiry checks for Nagios/Icinga style monitoring.
//!
//! A check reads the validity interval of one certificate, either from a live
//! TLS endpoint (optionally after a STARTTLS upgrade) or from a PEM file, and
//! classifies it against warning and critical thresholds:
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use tlsexpiry::{evaluate, StatusLevel, Thresholds, ValidityInterval};
//!
//! let interval = ValidityInterval::new(
//!     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
//! );
//! let thresholds = Thresholds::new(14, 7).unwrap();
//! let now = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();
//!
//! let result = evaluate(&interval, now, &thresholds);
//! assert_eq!(result.status, StatusLevel::Warning);
//! assert_eq!(
//!     tlsexpiry::report::status_line(&result),
//!     "WARNING - Expires: 2024-06-01 00:00:00 | days_remaining=12.0"
//! );
//! ```

use chrono::{DateTime, Utc};
use log::debug;

pub mod config;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod report;
pub mod source;
pub mod starttls;
pub mod status;

pub use config::{CheckSettings, Config, ConfigError, Target, Thresholds};
pub use error::CheckError;
pub use evaluator::{evaluate, EvaluationResult, ValidityInterval};
pub use source::CertificateTimeSource;
pub use status::StatusLevel;

/// Reads the certificate from `source` and evaluates it at `now`.
///
/// Any connection the source opened is closed before evaluation starts.
pub fn check(
    source: &dyn CertificateTimeSource,
    now: DateTime<Utc>,
    thresholds: &Thresholds,
) -> Result<EvaluationResult, CheckError> {
    let interval = source.validity_interval()?;
    debug!(
        "certificate valid from {} to {}",
        interval.not_before, interval.not_after
    );
    Ok(evaluate(&interval, now, thresholds))
}
