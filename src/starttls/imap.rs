// IMAP STARTTLS negotiator

use super::{Conversation, StarttlsNegotiator, StarttlsProtocol, Stream};
use crate::error::CheckError;

/// IMAP negotiator
pub struct ImapNegotiator;

impl StarttlsNegotiator for ImapNegotiator {
    fn negotiate(&self, stream: &mut dyn Stream) -> Result<(), CheckError> {
        let mut conversation = Conversation::new(stream, StarttlsProtocol::Imap);

        let greeting = conversation.read_line()?;
        if !greeting.starts_with("* OK") {
            return Err(conversation.fail(format!("greeting failed: {}", greeting.trim_end())));
        }

        conversation.send(b"a001 CAPABILITY\r\n")?;
        let mut supported = false;
        loop {
            let line = conversation.read_line()?;
            if line.to_uppercase().contains("STARTTLS") {
                supported = true;
            }
            if line.starts_with("a001 OK") {
                break;
            }
            if line.starts_with("a001 ") {
                return Err(conversation.fail("CAPABILITY command failed"));
            }
        }
        if !supported {
            return Err(conversation.fail("server does not support STARTTLS"));
        }

        conversation.send(b"a002 STARTTLS\r\n")?;
        let response = conversation.read_line()?;
        if !response.starts_with("a002 OK") {
            return Err(conversation.fail(format!("STARTTLS refused: {}", response.trim_end())));
        }

        Ok(())
    }

    fn protocol(&self) -> StarttlsProtocol {
        StarttlsProtocol::Imap
    }
}
