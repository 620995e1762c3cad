//! Monitoring-plugin status levels.
//!
//! A check ends with exactly one of these levels, printed as the prefix of the
//! status line and returned as the process exit code.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Severity of a check result, ordered `Ok < Warning < Critical`.
///
/// `Unknown` is reserved for failures that prevent a check from running at all
/// (usage and configuration errors) and is never produced by the evaluator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusLevel {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl StatusLevel {
    /// Process exit code expected by Nagios/Icinga style supervisors.
    pub fn exit_code(self) -> i32 {
        match self {
            StatusLevel::Ok => 0,
            StatusLevel::Warning => 1,
            StatusLevel::Critical => 2,
            StatusLevel::Unknown => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_exit_codes() {
        assert_eq!(StatusLevel::Ok.exit_code(), 0);
        assert_eq!(StatusLevel::Warning.exit_code(), 1);
        assert_eq!(StatusLevel::Critical.exit_code(), 2);
        assert_eq!(StatusLevel::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(StatusLevel::Ok.to_string(), "OK");
        assert_eq!(StatusLevel::Warning.to_string(), "WARNING");
        assert_eq!(StatusLevel::Critical.to_string(), "CRITICAL");
        assert_eq!(StatusLevel::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_severity_order() {
        assert!(StatusLevel::Ok < StatusLevel::Warning);
        assert!(StatusLevel::Warning < StatusLevel::Critical);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(StatusLevel::from_str("warning").unwrap(), StatusLevel::Warning);
        assert_eq!(StatusLevel::from_str("CRITICAL").unwrap(), StatusLevel::Critical);
        assert!(StatusLevel::from_str("fatal").is_err());
    }
}
