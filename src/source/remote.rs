use std::io;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;
use openssl::ssl::{Ssl, SslContext, SslMethod, SslVerifyMode};

use super::{interval_from_x509, CertificateTimeSource};
use crate::config::DEFAULT_TIMEOUT;
use crate::error::CheckError;
use crate::evaluator::ValidityInterval;
use crate::starttls::{get_negotiator, StarttlsProtocol};

/// Fetches the peer certificate from a live TLS endpoint.
///
/// Verification is disabled on purpose so that expired and not yet valid
/// certificates can still be read and reported.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    host: String,
    port: u16,
    starttls: Option<StarttlsProtocol>,
    timeout: Duration,
}

impl RemoteSource {
    pub fn new(host: &str, port: u16) -> Self {
        RemoteSource {
            host: host.to_string(),
            port,
            starttls: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
        }
    }

    pub fn with_starttls(mut self, protocol: StarttlsProtocol) -> Self {
        self.starttls = Some(protocol);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&self) -> Result<TcpStream, CheckError> {
        let addresses: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| CheckError::DnsResolution {
                hostname: self.host.clone(),
                source,
            })?
            .collect();
        if addresses.is_empty() {
            return Err(CheckError::DnsResolution {
                hostname: self.host.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
            });
        }

        let mut last_error = None;
        for address in addresses {
            debug!("connecting to {}", address);
            match TcpStream::connect_timeout(&address, self.timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.timeout))?;
                    stream.set_write_timeout(Some(self.timeout))?;
                    return Ok(stream);
                }
                Err(e) => {
                    debug!("connection to {} failed: {}", address, e);
                    last_error = Some(e);
                }
            }
        }

        Err(CheckError::ConnectionFailed {
            address: self.address(),
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no address reachable")),
        })
    }
}

impl CertificateTimeSource for RemoteSource {
    fn validity_interval(&self) -> Result<ValidityInterval, CheckError> {
        let mut tcp_stream = self.connect()?;

        if let Some(protocol) = self.starttls {
            let negotiator = get_negotiator(protocol, &self.host);
            debug!(
                "negotiating {} STARTTLS with {}",
                negotiator.protocol().name(),
                self.address()
            );
            negotiator.negotiate(&mut tcp_stream)?;
        }

        let mut context = SslContext::builder(SslMethod::tls())?;
        context.set_verify(SslVerifyMode::empty());
        let context = context.build();

        let mut connector = Ssl::new(&context)?;
        // SNI must not carry IP literals
        if self.host.parse::<IpAddr>().is_err() {
            connector.set_hostname(&self.host)?;
        }

        let mut stream = connector.connect(tcp_stream)?;
        debug!(
            "TLS handshake with {} done using {}",
            self.address(),
            stream.ssl().version_str()
        );

        let cert = stream
            .ssl()
            .peer_certificate()
            .ok_or_else(|| CheckError::ParseFailed {
                reason: format!("{} presented no certificate", self.address()),
                raw: None,
            })?;

        if let Err(e) = stream.shutdown() {
            debug!("TLS shutdown with {} failed: {}", self.address(), e);
        }
        drop(stream);

        interval_from_x509(&cert)
    }
}
