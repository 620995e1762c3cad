//! Configuration for a check run.
//!
//! Settings come from three layers, merged with clear precedence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (given with --config)
//! 3. Command-line arguments (highest priority)
//!
//! The merged [`Config`] is then resolved into [`CheckSettings`]. Resolution is
//! the gate that rejects a nonsensical configuration (such as a warning
//! threshold below the critical one) before any network activity happens.
//!
//! # Example Configuration File
//!
//! ```toml
//! host = "mail.example.com"
//! starttls = "smtp"
//! warning = 30
//! critical = 14
//!
//! [prometheus]
//! enabled = true
//! address = "http://localhost:9091"
//! ```

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::report::OutputFormat;
use crate::starttls::StarttlsProtocol;

/// Port used when neither a port nor a STARTTLS protocol is given.
pub const DEFAULT_PORT: u16 = 443;
/// Seconds to wait for connect, read and write operations.
pub const DEFAULT_TIMEOUT: u64 = 30;
pub const DEFAULT_PROMETHEUS_ADDRESS: &str = "http://localhost:9091";

/// Warning and critical thresholds, in whole days before expiry.
///
/// Construction enforces `warning_days >= critical_days`: a warning must stand
/// for a larger, less urgent, time budget than critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    warning_days: i32,
    critical_days: i32,
}

impl Thresholds {
    pub fn new(warning_days: i32, critical_days: i32) -> Result<Self, ConfigError> {
        if warning_days < critical_days {
            return Err(ConfigError::Validation(format!(
                "warning days ({}) must be greater than or equal to critical days ({})",
                warning_days, critical_days
            )));
        }
        Ok(Thresholds {
            warning_days,
            critical_days,
        })
    }

    pub fn warning_days(&self) -> i32 {
        self.warning_days
    }

    pub fn critical_days(&self) -> i32 {
        self.critical_days
    }

    /// Warning threshold as a duration of whole days.
    pub fn warning(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.warning_days))
    }

    /// Critical threshold as a duration of whole days.
    pub fn critical(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.critical_days))
    }
}

/// Main configuration structure.
///
/// All fields are optional to support partial configuration and merging.
/// Missing values will be filled in by defaults or overridden by CLI arguments.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Server to connect to
    pub host: Option<String>,
    /// Port to connect to
    pub port: Option<u16>,
    /// Days before expiry that raise a warning
    pub warning: Option<i32>,
    /// Days before expiry that raise a critical
    pub critical: Option<i32>,
    /// STARTTLS protocol to negotiate before the handshake
    pub starttls: Option<String>,
    /// Read the certificate from a PEM file instead of a server
    pub cert_file: Option<PathBuf>,
    /// Network timeout in seconds
    pub timeout: Option<u64>,
    /// Output format: nagios, json
    pub output: Option<String>,
    /// Prometheus configuration
    pub prometheus: Option<PrometheusConfig>,
}

/// Prometheus integration configuration.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct PrometheusConfig {
    /// Enable prometheus metrics pushing
    pub enabled: Option<bool>,
    /// Prometheus push gateway address (e.g., "http://localhost:9091")
    pub address: Option<String>,
}

/// Where the certificate under check comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Remote {
        host: String,
        port: u16,
        starttls: Option<StarttlsProtocol>,
    },
    File(PathBuf),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Remote { host, port, .. } => write!(f, "{}:{}", host, port),
            Target::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fully validated settings for a single check run.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSettings {
    pub target: Target,
    pub thresholds: Thresholds,
    pub timeout: Duration,
    pub output: OutputFormat,
    /// Push gateway address, when metrics pushing is enabled
    pub prometheus: Option<String>,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Creates the lowest-priority configuration layer.
    ///
    /// # Default Values
    ///
    /// - `timeout`: 30 seconds
    /// - `output`: "nagios"
    /// - `prometheus.enabled`: false
    /// - `prometheus.address`: "http://localhost:9091"
    ///
    /// Thresholds and the target have no defaults and must be provided.
    pub fn defaults() -> Self {
        Config {
            timeout: Some(DEFAULT_TIMEOUT),
            output: Some(OutputFormat::Nagios.to_string()),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some(DEFAULT_PROMETHEUS_ADDRESS.to_string()),
            }),
            ..Config::default()
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// For each field, if the `other` config has a value (Some), it overrides
    /// this config's value. If the `other` value is None, keeps the current value.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.warning.is_some() {
            self.warning = other.warning;
        }
        if other.critical.is_some() {
            self.critical = other.critical;
        }
        if other.starttls.is_some() {
            self.starttls = other.starttls;
        }
        if other.cert_file.is_some() {
            self.cert_file = other.cert_file;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.output.is_some() {
            self.output = other.output;
        }
        if let Some(other_prom) = other.prometheus {
            if let Some(ref mut self_prom) = self.prometheus {
                if other_prom.enabled.is_some() {
                    self_prom.enabled = other_prom.enabled;
                }
                if other_prom.address.is_some() {
                    self_prom.address = other_prom.address;
                }
            } else {
                self.prometheus = Some(other_prom);
            }
        }
        self
    }

    /// Validates the merged configuration and turns it into [`CheckSettings`].
    pub fn resolve(self) -> Result<CheckSettings, ConfigError> {
        let warning = self
            .warning
            .ok_or_else(|| ConfigError::Validation("warning days must be provided".to_string()))?;
        let critical = self
            .critical
            .ok_or_else(|| ConfigError::Validation("critical days must be provided".to_string()))?;
        let thresholds = Thresholds::new(warning, critical)?;

        let starttls = match self.starttls {
            Some(name) => Some(name.parse::<StarttlsProtocol>().map_err(|_| {
                ConfigError::Validation(format!("unsupported STARTTLS protocol: {}", name))
            })?),
            None => None,
        };

        let target = match (self.host, self.cert_file) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "a server and a certificate file cannot both be checked".to_string(),
                ))
            }
            (Some(host), None) => {
                if host.trim().is_empty() {
                    return Err(ConfigError::Validation("server cannot be empty".to_string()));
                }
                let port = self
                    .port
                    .or_else(|| starttls.map(|protocol| protocol.default_port()))
                    .unwrap_or(DEFAULT_PORT);
                Target::Remote {
                    host,
                    port,
                    starttls,
                }
            }
            (None, Some(path)) => {
                if starttls.is_some() {
                    return Err(ConfigError::Validation(
                        "STARTTLS only applies when checking a server".to_string(),
                    ));
                }
                Target::File(path)
            }
            (None, None) => {
                return Err(ConfigError::Validation(
                    "server or certificate file must be provided".to_string(),
                ))
            }
        };

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout == 0 {
            return Err(ConfigError::Validation(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let output = match self.output {
            Some(name) => name
                .parse::<OutputFormat>()
                .map_err(|_| ConfigError::Validation(format!("unsupported output format: {}", name)))?,
            None => OutputFormat::Nagios,
        };

        let prometheus = match self.prometheus {
            Some(PrometheusConfig {
                enabled: Some(true),
                address,
            }) => Some(address.unwrap_or_else(|| DEFAULT_PROMETHEUS_ADDRESS.to_string())),
            _ => None,
        };

        Ok(CheckSettings {
            target,
            thresholds,
            timeout: Duration::from_secs(timeout),
            output,
            prometheus,
        })
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            host: Some("mail.example.com".to_string()),
            port: Some(25),
            warning: Some(30),
            critical: Some(14),
            starttls: Some("smtp".to_string()),
            cert_file: None,
            timeout: Some(DEFAULT_TIMEOUT),
            output: Some(OutputFormat::Nagios.to_string()),
            prometheus: Some(PrometheusConfig {
                enabled: Some(false),
                address: Some(DEFAULT_PROMETHEUS_ADDRESS.to_string()),
            }),
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    Parse(String),
    /// Validation error (missing required fields, invalid values, etc.)
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO Error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse Error: {}", msg),
            ConfigError::Validation(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn minimal() -> Config {
        Config {
            host: Some("example.com".to_string()),
            warning: Some(14),
            critical: Some(7),
            ..Config::defaults()
        }
    }

    #[test]
    fn test_thresholds_accept_equal_values() {
        let thresholds = Thresholds::new(7, 7).unwrap();
        assert_eq!(thresholds.warning(), thresholds.critical());
        assert_eq!(thresholds.critical(), TimeDelta::days(7));
    }

    #[test]
    fn test_thresholds_accept_zero() {
        let thresholds = Thresholds::new(0, 0).unwrap();
        assert_eq!(thresholds.critical(), TimeDelta::zero());
    }

    #[test]
    fn test_thresholds_reject_warning_below_critical() {
        match Thresholds::new(5, 10) {
            Err(ConfigError::Validation(msg)) => {
                assert!(msg.contains("warning days (5)"));
                assert!(msg.contains("critical days (10)"));
            }
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
            host = "mail.example.com"
            starttls = "smtp"
            warning = 30
            critical = 14
            timeout = 10

            [prometheus]
            enabled = true
            address = "http://localhost:9092"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.host, Some("mail.example.com".to_string()));
        assert_eq!(config.starttls, Some("smtp".to_string()));
        assert_eq!(config.warning, Some(30));
        assert_eq!(config.critical, Some(14));
        assert_eq!(config.timeout, Some(10));
        assert_eq!(config.port, None);

        let prometheus = config.prometheus.unwrap();
        assert_eq!(prometheus.enabled, Some(true));
        assert_eq!(
            prometheus.address,
            Some("http://localhost:9092".to_string())
        );
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"warning = [invalid toml").unwrap();

        match Config::from_file(temp_file.path()) {
            Err(ConfigError::Parse(_)) => {}
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        match Config::from_file("/nonexistent/tlsexpiry.toml") {
            Err(ConfigError::Io(_)) => {}
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_config_merge() {
        let file_config = Config {
            host: Some("file.example.com".to_string()),
            warning: Some(30),
            critical: Some(14),
            prometheus: Some(PrometheusConfig {
                enabled: Some(true),
                address: None,
            }),
            ..Config::default()
        };
        let cli_config = Config {
            critical: Some(7),
            port: Some(8443),
            ..Config::default()
        };

        let merged = Config::defaults()
            .merge_with(file_config)
            .merge_with(cli_config);

        assert_eq!(merged.host, Some("file.example.com".to_string()));
        assert_eq!(merged.port, Some(8443));
        assert_eq!(merged.warning, Some(30));
        assert_eq!(merged.critical, Some(7));
        assert_eq!(merged.timeout, Some(DEFAULT_TIMEOUT));

        let prometheus = merged.prometheus.unwrap();
        assert_eq!(prometheus.enabled, Some(true));
        assert_eq!(
            prometheus.address,
            Some(DEFAULT_PROMETHEUS_ADDRESS.to_string())
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = minimal().resolve().unwrap();

        assert_eq!(
            settings.target,
            Target::Remote {
                host: "example.com".to_string(),
                port: DEFAULT_PORT,
                starttls: None,
            }
        );
        assert_eq!(settings.thresholds, Thresholds::new(14, 7).unwrap());
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT));
        assert_eq!(settings.output, OutputFormat::Nagios);
        assert_eq!(settings.prometheus, None);
    }

    #[test]
    fn test_resolve_starttls_default_port() {
        let settings = Config {
            starttls: Some("IMAP".to_string()),
            ..minimal()
        }
        .resolve()
        .unwrap();

        assert_eq!(
            settings.target,
            Target::Remote {
                host: "example.com".to_string(),
                port: 143,
                starttls: Some(StarttlsProtocol::Imap),
            }
        );
    }

    #[test]
    fn test_resolve_explicit_port_wins() {
        let settings = Config {
            starttls: Some("smtp".to_string()),
            port: Some(587),
            ..minimal()
        }
        .resolve()
        .unwrap();

        assert_eq!(settings.target.to_string(), "example.com:587");
    }

    #[test]
    fn test_resolve_rejects_inverted_thresholds() {
        let result = Config {
            warning: Some(5),
            critical: Some(10),
            ..minimal()
        }
        .resolve();

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_requires_thresholds() {
        let result = Config {
            warning: None,
            ..minimal()
        }
        .resolve();
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = Config {
            critical: None,
            ..minimal()
        }
        .resolve();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_requires_single_target() {
        let result = Config {
            host: None,
            ..minimal()
        }
        .resolve();
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = Config {
            cert_file: Some(PathBuf::from("cert.pem")),
            ..minimal()
        }
        .resolve();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_cert_file() {
        let settings = Config {
            host: None,
            cert_file: Some(PathBuf::from("/etc/ssl/cert.pem")),
            ..minimal()
        }
        .resolve()
        .unwrap();

        assert_eq!(settings.target, Target::File(PathBuf::from("/etc/ssl/cert.pem")));
    }

    #[test]
    fn test_resolve_rejects_unknown_names() {
        let result = Config {
            starttls: Some("gopher".to_string()),
            ..minimal()
        }
        .resolve();
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let result = Config {
            output: Some("table".to_string()),
            ..minimal()
        }
        .resolve();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_rejects_zero_timeout() {
        let result = Config {
            timeout: Some(0),
            ..minimal()
        }
        .resolve();
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_resolve_prometheus_enabled() {
        let settings = Config {
            prometheus: Some(PrometheusConfig {
                enabled: Some(true),
                address: None,
            }),
            ..minimal()
        }
        .resolve()
        .unwrap();

        assert_eq!(
            settings.prometheus,
            Some(DEFAULT_PROMETHEUS_ADDRESS.to_string())
        );
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::example_toml();

        let parsed: Config = toml::from_str(&example).unwrap();
        let settings = parsed.resolve().unwrap();

        assert_eq!(settings.target.to_string(), "mail.example.com:25");
        assert_eq!(settings.thresholds.warning_days(), 30);
        assert_eq!(settings.thresholds.critical_days(), 14);
    }
}
