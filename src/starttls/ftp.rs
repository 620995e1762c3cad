// FTP STARTTLS negotiator (AUTH TLS, RFC 4217)

use super::{Conversation, StarttlsNegotiator, StarttlsProtocol, Stream};
use crate::error::CheckError;

/// FTP negotiator
pub struct FtpNegotiator;

impl StarttlsNegotiator for FtpNegotiator {
    fn negotiate(&self, stream: &mut dyn Stream) -> Result<(), CheckError> {
        let mut conversation = Conversation::new(stream, StarttlsProtocol::Ftp);

        let (code, _) = conversation.read_reply()?;
        if code != 220 {
            return Err(conversation.fail(format!("greeting failed: expected 220, got {}", code)));
        }

        conversation.send(b"AUTH TLS\r\n")?;
        let (code, _) = conversation.read_reply()?;
        if code != 234 {
            return Err(conversation.fail(format!("AUTH TLS refused: expected 234, got {}", code)));
        }

        Ok(())
    }

    fn protocol(&self) -> StarttlsProtocol {
        StarttlsProtocol::Ftp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starttls::mock::MockStream;

    #[test]
    fn test_ftp_upgrade() {
        let mut stream =
            MockStream::new("220-Welcome\r\n220 FTP ready\r\n234 AUTH TLS successful\r\n");

        FtpNegotiator.negotiate(&mut stream).unwrap();

        assert_eq!(stream.sent(), "AUTH TLS\r\n");
    }

    #[test]
    fn test_ftp_auth_refused() {
        let mut stream = MockStream::new("220 ready\r\n502 not implemented\r\n");

        let err = FtpNegotiator.negotiate(&mut stream).unwrap_err();

        assert!(err.to_string().contains("expected 234, got 502"));
    }
}
