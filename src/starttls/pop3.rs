// POP3 STARTTLS negotiator

use super::{Conversation, StarttlsNegotiator, StarttlsProtocol, Stream};
use crate::error::CheckError;

/// POP3 negotiator. POP3 calls the upgrade command STLS.
pub struct Pop3Negotiator;

impl StarttlsNegotiator for Pop3Negotiator {
    fn negotiate(&self, stream: &mut dyn Stream) -> Result<(), CheckError> {
        let mut conversation = Conversation::new(stream, StarttlsProtocol::Pop3);

        let greeting = conversation.read_line()?;
        if !greeting.starts_with("+OK") {
            return Err(conversation.fail(format!("greeting failed: {}", greeting.trim_end())));
        }

        conversation.send(b"CAPA\r\n")?;
        let response = conversation.read_line()?;
        if !response.starts_with("+OK") {
            return Err(conversation.fail("CAPA command failed"));
        }

        let mut supported = false;
        loop {
            let line = conversation.read_line()?;
            let line = line.trim();
            if line == "." {
                break;
            }
            if line.eq_ignore_ascii_case("STLS") {
                supported = true;
            }
        }
        if !supported {
            return Err(conversation.fail("server does not support STLS"));
        }

        conversation.send(b"STLS\r\n")?;
        let response = conversation.read_line()?;
        if !response.starts_with("+OK") {
            return Err(conversation.fail(format!("STLS refused: {}", response.trim_end())));
        }

        Ok(())
    }

    fn protocol(&self) -> StarttlsProtocol {
        StarttlsProtocol::Pop3
    }
}
