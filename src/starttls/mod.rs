//! STARTTLS support.
//!
//! Some services start out in plaintext and upgrade the connection to TLS on
//! request. A negotiator drives that plaintext exchange up to the point where
//! the TLS handshake can begin on the same stream.

use std::io::{BufRead, BufReader, Read, Write};

use strum_macros::{Display, EnumString};

use crate::error::CheckError;

pub mod ftp;
pub mod imap;
pub mod pop3;
pub mod postgres;
pub mod smtp;
pub mod xmpp;

/// Upper bound on what we buffer from a server before giving up.
const MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// STARTTLS protocols, named as `openssl s_client -starttls` names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StarttlsProtocol {
    Smtp,
    Lmtp,
    Pop3,
    Imap,
    Ftp,
    Xmpp,
    Postgres,
}

impl StarttlsProtocol {
    /// Get default port for protocol
    pub fn default_port(&self) -> u16 {
        match self {
            StarttlsProtocol::Smtp => 25,
            StarttlsProtocol::Lmtp => 24,
            StarttlsProtocol::Pop3 => 110,
            StarttlsProtocol::Imap => 143,
            StarttlsProtocol::Ftp => 21,
            StarttlsProtocol::Xmpp => 5222,
            StarttlsProtocol::Postgres => 5432,
        }
    }

    /// Human readable protocol name
    pub fn name(&self) -> &'static str {
        match self {
            StarttlsProtocol::Smtp => "SMTP",
            StarttlsProtocol::Lmtp => "LMTP",
            StarttlsProtocol::Pop3 => "POP3",
            StarttlsProtocol::Imap => "IMAP",
            StarttlsProtocol::Ftp => "FTP",
            StarttlsProtocol::Xmpp => "XMPP",
            StarttlsProtocol::Postgres => "PostgreSQL",
        }
    }
}

/// Anything a negotiator can talk over.
pub trait Stream: Read + Write {}

impl<T: Read + Write> Stream for T {}

/// Drives the plaintext part of a STARTTLS upgrade.
pub trait StarttlsNegotiator {
    /// Returns once the server has agreed to start TLS on `stream`.
    fn negotiate(&self, stream: &mut dyn Stream) -> Result<(), CheckError>;

    fn protocol(&self) -> StarttlsProtocol;
}

/// Get a negotiator instance for the given protocol and hostname
pub fn get_negotiator(protocol: StarttlsProtocol, hostname: &str) -> Box<dyn StarttlsNegotiator> {
    match protocol {
        StarttlsProtocol::Smtp => Box::new(smtp::SmtpNegotiator::smtp(hostname)),
        StarttlsProtocol::Lmtp => Box::new(smtp::SmtpNegotiator::lmtp(hostname)),
        StarttlsProtocol::Pop3 => Box::new(pop3::Pop3Negotiator),
        StarttlsProtocol::Imap => Box::new(imap::ImapNegotiator),
        StarttlsProtocol::Ftp => Box::new(ftp::FtpNegotiator),
        StarttlsProtocol::Xmpp => Box::new(xmpp::XmppNegotiator::new(hostname)),
        StarttlsProtocol::Postgres => Box::new(postgres::PostgresNegotiator),
    }
}

/// Line-oriented exchange with a plaintext server.
pub(crate) struct Conversation<'a> {
    reader: BufReader<&'a mut dyn Stream>,
    protocol: StarttlsProtocol,
}

impl<'a> Conversation<'a> {
    pub(crate) fn new(stream: &'a mut dyn Stream, protocol: StarttlsProtocol) -> Self {
        Conversation {
            reader: BufReader::new(stream),
            protocol,
        }
    }

    pub(crate) fn fail<D: Into<String>>(&self, details: D) -> CheckError {
        CheckError::starttls(self.protocol.name(), details)
    }

    /// Reads one line, failing if the server hung up.
    pub(crate) fn read_line(&mut self) -> Result<String, CheckError> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Err(self.fail("connection closed by server"));
        }
        log::trace!("{} < {}", self.protocol.name(), line.trim_end());
        Ok(line)
    }

    /// Reads a numeric reply, following `NNN-` continuation lines.
    pub(crate) fn read_reply(&mut self) -> Result<(u16, Vec<String>), CheckError> {
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let code = line
                .get(0..3)
                .and_then(|code| code.parse::<u16>().ok())
                .ok_or_else(|| self.fail(format!("invalid reply: {}", line.trim_end())))?;
            let last = line.as_bytes().get(3) != Some(&b'-');
            lines.push(line);
            if last {
                return Ok((code, lines));
            }
        }
    }

    /// Reads raw bytes up to and including `marker`, returning everything read.
    pub(crate) fn read_until_marker(&mut self, marker: &str) -> Result<String, CheckError> {
        let marker = marker.as_bytes();
        let mut received = Vec::new();
        let mut byte = [0u8; 1];
        while !received.ends_with(marker) {
            let read = self.reader.read(&mut byte)?;
            if read == 0 {
                return Err(self.fail("connection closed by server"));
            }
            received.push(byte[0]);
            if received.len() > MAX_RESPONSE_BYTES {
                return Err(self.fail("response too large"));
            }
        }
        Ok(String::from_utf8_lossy(&received).into_owned())
    }

    pub(crate) fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CheckError> {
        self.reader.read_exact(buf)?;
        Ok(())
    }

    pub(crate) fn send(&mut self, data: &[u8]) -> Result<(), CheckError> {
        let stream = self.reader.get_mut();
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }
}
