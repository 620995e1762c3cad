use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use openssl::x509::X509;

use super::{interval_from_x509, CertificateTimeSource};
use crate::error::CheckError;
use crate::evaluator::ValidityInterval;

/// Reads the certificate from a PEM file on disk.
///
/// Bundles such as `fullchain.pem` are accepted; the first certificate in the
/// file is the one checked.
#[derive(Debug, Clone)]
pub struct PemFileSource {
    path: PathBuf,
}

impl PemFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        PemFileSource {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CertificateTimeSource for PemFileSource {
    fn validity_interval(&self) -> Result<ValidityInterval, CheckError> {
        let data = fs::read(&self.path)?;
        let raw = || Some(String::from_utf8_lossy(&data).into_owned());

        let certs = X509::stack_from_pem(&data).map_err(|e| CheckError::ParseFailed {
            reason: format!("invalid PEM data in {}: {}", self.path.display(), e),
            raw: raw(),
        })?;
        debug!("{} certificate(s) in {}", certs.len(), self.path.display());

        match certs.first() {
            Some(cert) => interval_from_x509(cert),
            None => Err(CheckError::ParseFailed {
                reason: format!("unexpected number of certificates in {}: 0", self.path.display()),
                raw: raw(),
            }),
        }
    }
}
