//! Certificate time sources.
//!
//! A source produces the validity interval of exactly one certificate, or a
//! typed failure. The evaluator never sees how the certificate was obtained.

use chrono::{DateTime, TimeZone, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::x509::X509Ref;

use crate::config::{CheckSettings, Target};
use crate::error::CheckError;
use crate::evaluator::ValidityInterval;

mod pem;
mod remote;

pub use pem::PemFileSource;
pub use remote::RemoteSource;

/// Anything that can tell when a certificate is valid.
pub trait CertificateTimeSource {
    fn validity_interval(&self) -> Result<ValidityInterval, CheckError>;
}

/// Builds the source matching the configured target.
pub fn for_settings(settings: &CheckSettings) -> Box<dyn CertificateTimeSource> {
    match &settings.target {
        Target::Remote {
            host,
            port,
            starttls,
        } => {
            let mut source = RemoteSource::new(host, *port).with_timeout(settings.timeout);
            if let Some(protocol) = starttls {
                source = source.with_starttls(*protocol);
            }
            Box::new(source)
        }
        Target::File(path) => Box::new(PemFileSource::new(path)),
    }
}

/// Reads `notBefore` and `notAfter` from a parsed certificate.
pub fn interval_from_x509(cert: &X509Ref) -> Result<ValidityInterval, CheckError> {
    Ok(ValidityInterval::new(
        asn1_to_utc(cert.not_before())?,
        asn1_to_utc(cert.not_after())?,
    ))
}

fn asn1_to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>, CheckError> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    let seconds = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| CheckError::ParseFailed {
            reason: format!("certificate time out of range: {}", time),
            raw: None,
        })
}

#[cfg(test)]
pub(crate) mod testing {
    use openssl::asn1::Asn1Time;
    use openssl::ec::{EcGroup, EcKey};
    use openssl::hash::MessageDigest;
    use openssl::nid::Nid;
    use openssl::pkey::{PKey, Private};
    use openssl::x509::{X509NameBuilder, X509};

    /// Self-signed certificate valid between two unix timestamps.
    pub(crate) fn self_signed(not_before: i64, not_after: i64) -> (X509, PKey<Private>) {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, "localhost").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::from_unix(not_before as _).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::from_unix(not_after as _).unwrap())
            .unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();

        (builder.build(), key)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::self_signed;
    use super::*;

    // 2024-01-01T00:00:00Z and 2024-06-01T12:30:15Z
    const NOT_BEFORE: i64 = 1_704_067_200;
    const NOT_AFTER: i64 = 1_717_245_015;

    #[test]
    fn test_interval_from_x509() {
        let (cert, _) = self_signed(NOT_BEFORE, NOT_AFTER);

        let interval = interval_from_x509(&cert).unwrap();

        assert_eq!(interval.not_before, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            interval.not_after,
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 15).unwrap()
        );
    }

    #[test]
    fn test_inverted_interval_is_kept() {
        let (cert, _) = self_signed(NOT_AFTER, NOT_BEFORE);

        let interval = interval_from_x509(&cert).unwrap();

        assert!(interval.not_after < interval.not_before);
    }

    #[test]
    fn test_pre_epoch_times() {
        // 1969-12-31T00:00:00Z
        let (cert, _) = self_signed(-86_400, NOT_AFTER);

        let interval = interval_from_x509(&cert).unwrap();

        assert_eq!(interval.not_before.timestamp(), -86_400);
    }
}
