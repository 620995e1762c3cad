//! Error types for certificate retrieval and check setup.
//!
//! Every variant ends the check run. Configuration problems are reported as
//! UNKNOWN, anything that stops us from reading the certificate as CRITICAL.

use std::fmt;
use std::io;

use crate::status::StatusLevel;

/// Error type for a failed check run.
#[derive(Debug)]
pub enum CheckError {
    /// The check was configured in a way that makes no sense
    InvalidConfig {
        /// What is wrong with the configuration
        reason: String,
    },

    /// DNS resolution failed for the given hostname
    DnsResolution {
        /// The hostname that failed to resolve
        hostname: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// TCP connection failed to the target address
    ConnectionFailed {
        /// The address (host:port) that connection failed to
        address: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// The plaintext protocol did not let us upgrade to TLS
    Starttls {
        /// Protocol being negotiated
        protocol: String,
        /// What the server did instead
        details: String,
    },

    /// TLS handshake failed
    HandshakeFailed {
        /// Details about why the handshake failed
        details: String,
    },

    /// Certificate data did not have the expected shape
    ParseFailed {
        /// Description of what went wrong
        reason: String,
        /// Raw data we tried to parse, shown to the operator
        raw: Option<String>,
    },

    /// OpenSSL error occurred
    OpenSSLError {
        /// The underlying OpenSSL error
        details: String,
    },

    /// Generic I/O error
    IoError {
        /// The underlying I/O error
        source: io::Error,
    },
}

impl CheckError {
    /// Status level a failed run is reported with.
    pub fn status(&self) -> StatusLevel {
        match self {
            Self::InvalidConfig { .. } => StatusLevel::Unknown,
            _ => StatusLevel::Critical,
        }
    }

    /// Raw diagnostic output attached to the error, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::ParseFailed { raw, .. } => raw.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn starttls<P: fmt::Display, D: Into<String>>(protocol: P, details: D) -> Self {
        Self::Starttls {
            protocol: protocol.to_string(),
            details: details.into(),
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "Invalid configuration: {}", reason),
            Self::DnsResolution { hostname, source } => {
                write!(f, "Failed to resolve hostname {}: {}", hostname, source)
            }
            Self::ConnectionFailed { address, source } => {
                write!(f, "Connection failed to {}: {}", address, source)
            }
            Self::Starttls { protocol, details } => {
                write!(f, "{} STARTTLS negotiation failed: {}", protocol, details)
            }
            Self::HandshakeFailed { details } => write!(f, "TLS handshake failed: {}", details),
            Self::ParseFailed { reason, .. } => write!(f, "Certificate error: {}", reason),
            Self::OpenSSLError { details } => write!(f, "OpenSSL error: {}", details),
            Self::IoError { source } => write!(f, "I/O error: {}", source),
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DnsResolution { source, .. } => Some(source),
            Self::ConnectionFailed { source, .. } => Some(source),
            Self::IoError { source } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckError {
    fn from(e: io::Error) -> Self {
        Self::IoError { source: e }
    }
}

impl From<openssl::error::ErrorStack> for CheckError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Self::OpenSSLError {
            details: e.to_string(),
        }
    }
}

impl<S: fmt::Debug> From<openssl::ssl::HandshakeError<S>> for CheckError {
    fn from(e: openssl::ssl::HandshakeError<S>) -> Self {
        Self::HandshakeFailed {
            details: format!("{}", e),
        }
    }
}

impl From<crate::config::ConfigError> for CheckError {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::InvalidConfig {
            reason: e.to_string(),
        }
    }
}
