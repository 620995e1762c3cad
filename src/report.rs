//! Rendering of check results for the monitoring supervisor.
//!
//! The `nagios` format is the plugin contract:
//!
//! ```text
//! <STATUS> - Expires: <timestamp>[ Not valid until: <timestamp>] | days_remaining=<float>
//! ```
//!
//! Failures render as `<STATUS> - <reason>`, optionally followed by raw
//! diagnostic lines.

use strum_macros::{Display, EnumString};

use crate::error::CheckError;
use crate::evaluator::{format_timestamp, EvaluationResult};
use crate::status::StatusLevel;

/// Output formats for the status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    Nagios,
    Json,
}

/// Renders an evaluation result in the requested format.
pub fn render(result: &EvaluationResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Nagios => status_line(result),
        OutputFormat::Json => serde_json::to_string(result)
            .unwrap_or_else(|e| format!("{} - Failed to encode result: {}", StatusLevel::Unknown, e)),
    }
}

/// Renders a failed run. The status is taken from the error.
pub fn render_failure(error: &CheckError, format: OutputFormat) -> String {
    let status = error.status();
    match format {
        OutputFormat::Nagios => {
            let mut out = failure_line(status, &error.to_string());
            if let Some(raw) = error.diagnostic() {
                let raw = raw.trim_end();
                if !raw.is_empty() {
                    out.push('\n');
                    out.push_str(raw);
                }
            }
            out
        }
        OutputFormat::Json => serde_json::json!({
            "status": status,
            "message": error.to_string(),
            "diagnostic": error.diagnostic(),
        })
        .to_string(),
    }
}

/// The single plugin status line for an evaluation result.
pub fn status_line(result: &EvaluationResult) -> String {
    let not_valid_until = match &result.not_valid_until {
        Some(not_before) => format!(" Not valid until: {}", format_timestamp(not_before)),
        None => String::new(),
    };
    format!(
        "{} - Expires: {}{} | days_remaining={}",
        result.status,
        format_timestamp(&result.not_after),
        not_valid_until,
        format_days(result.days_remaining)
    )
}

/// A status line for runs that never reached evaluation.
pub fn failure_line(status: StatusLevel, reason: &str) -> String {
    format!("{} - {}", status, reason)
}

/// Formats perf data days without rounding, always with a decimal point.
pub fn format_days(days: f64) -> String {
    if days.is_finite() && days.fract() == 0.0 {
        format!("{:.1}", days)
    } else {
        days.to_string()
    }
}
