// XMPP STARTTLS negotiator (RFC 6120, client-to-server)

use super::{Conversation, StarttlsNegotiator, StarttlsProtocol, Stream};
use crate::error::CheckError;

/// XMPP negotiator
pub struct XmppNegotiator {
    domain: String,
}

impl XmppNegotiator {
    pub fn new(domain: &str) -> Self {
        XmppNegotiator {
            domain: domain.to_string(),
        }
    }
}

impl StarttlsNegotiator for XmppNegotiator {
    fn negotiate(&self, stream: &mut dyn Stream) -> Result<(), CheckError> {
        let mut conversation = Conversation::new(stream, StarttlsProtocol::Xmpp);

        let header = format!(
            "<?xml version='1.0'?><stream:stream xmlns='jabber:client' \
             xmlns:stream='http://etherx.jabber.org/streams' to='{}' version='1.0'>",
            self.domain
        );
        conversation.send(header.as_bytes())?;

        let features = conversation.read_until_marker("</stream:features>")?;
        if !features.contains("<starttls") {
            return Err(conversation.fail("server does not offer starttls"));
        }

        conversation.send(b"<starttls xmlns='urn:ietf:params:xml:ns:xmpp-tls'/>")?;
        let response = conversation.read_until_marker("/>")?;
        if !response.contains("<proceed") {
            return Err(conversation.fail(format!("starttls refused: {}", response.trim())));
        }

        Ok(())
    }

    fn protocol(&self) -> StarttlsProtocol {
        StarttlsProtocol::Xmpp
    }
}
