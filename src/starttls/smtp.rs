// SMTP and LMTP STARTTLS negotiator

use super::{Conversation, StarttlsNegotiator, StarttlsProtocol, Stream};
use crate::error::CheckError;

/// SMTP (EHLO) and LMTP (LHLO) share the same upgrade dialogue.
pub struct SmtpNegotiator {
    hostname: String,
    protocol: StarttlsProtocol,
}

impl SmtpNegotiator {
    pub fn smtp(hostname: &str) -> Self {
        SmtpNegotiator {
            hostname: hostname.to_string(),
            protocol: StarttlsProtocol::Smtp,
        }
    }

    pub fn lmtp(hostname: &str) -> Self {
        SmtpNegotiator {
            hostname: hostname.to_string(),
            protocol: StarttlsProtocol::Lmtp,
        }
    }

    fn hello_command(&self) -> &'static str {
        match self.protocol {
            StarttlsProtocol::Lmtp => "LHLO",
            _ => "EHLO",
        }
    }
}

impl StarttlsNegotiator for SmtpNegotiator {
    fn negotiate(&self, stream: &mut dyn Stream) -> Result<(), CheckError> {
        let mut conversation = Conversation::new(stream, self.protocol);

        let (code, _) = conversation.read_reply()?;
        if code != 220 {
            return Err(conversation.fail(format!("greeting failed: expected 220, got {}", code)));
        }

        let hello = self.hello_command();
        conversation.send(format!("{} {}\r\n", hello, self.hostname).as_bytes())?;
        let (code, lines) = conversation.read_reply()?;
        if code != 250 {
            return Err(conversation.fail(format!("{} failed: expected 250, got {}", hello, code)));
        }
        // capability lines look like "250-STARTTLS" or "250 STARTTLS"
        let supported = lines
            .iter()
            .any(|line| line.get(4..).map_or(false, |cap| cap.trim().eq_ignore_ascii_case("STARTTLS")));
        if !supported {
            return Err(conversation.fail("server does not support STARTTLS"));
        }

        conversation.send(b"STARTTLS\r\n")?;
        let (code, _) = conversation.read_reply()?;
        if code != 220 {
            return Err(conversation.fail(format!("STARTTLS refused: expected 220, got {}", code)));
        }

        Ok(())
    }

    fn protocol(&self) -> StarttlsProtocol {
        self.protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starttls::mock::MockStream;

    #[test]
    fn test_smtp_upgrade() {
        let mut stream = MockStream::new(
            "220-mail.example.com ESMTP\r\n220 ready\r\n\
             250-mail.example.com\r\n250-PIPELINING\r\n250-STARTTLS\r\n250 8BITMIME\r\n\
             220 2.0.0 Ready to start TLS\r\n",
        );

        SmtpNegotiator::smtp("mail.example.com")
            .negotiate(&mut stream)
            .unwrap();

        assert_eq!(stream.sent(), "EHLO mail.example.com\r\nSTARTTLS\r\n");
    }

    #[test]
    fn test_lmtp_uses_lhlo() {
        let mut stream = MockStream::new(
            "220 lmtp ready\r\n250-lmtp\r\n250 STARTTLS\r\n220 go ahead\r\n",
        );

        SmtpNegotiator::lmtp("client").negotiate(&mut stream).unwrap();

        assert_eq!(stream.sent(), "LHLO client\r\nSTARTTLS\r\n");
    }

    #[test]
    fn test_smtp_without_starttls() {
        let mut stream = MockStream::new("220 ready\r\n250-mail\r\n250 SIZE 1000\r\n");

        let err = SmtpNegotiator::smtp("client")
            .negotiate(&mut stream)
            .unwrap_err();

        assert!(err.to_string().contains("does not support STARTTLS"));
        assert!(!stream.sent().contains("STARTTLS"));
    }

    #[test]
    fn test_smtp_bad_greeting() {
        let mut stream = MockStream::new("554 go away\r\n");

        let err = SmtpNegotiator::smtp("client")
            .negotiate(&mut stream)
            .unwrap_err();

        assert!(err.to_string().contains("expected 220, got 554"));
    }

    #[test]
    fn test_smtp_starttls_refused() {
        let mut stream = MockStream::new("220 ready\r\n250 STARTTLS\r\n454 TLS not available\r\n");

        let err = SmtpNegotiator::smtp("client")
            .negotiate(&mut stream)
            .unwrap_err();

        assert!(err.to_string().contains("got 454"));
    }
}
