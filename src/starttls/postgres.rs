// PostgreSQL STARTTLS negotiator (SSLRequest)

use super::{Conversation, StarttlsNegotiator, StarttlsProtocol, Stream};
use crate::error::CheckError;

/// Length 8 followed by the SSLRequest code 80877103, both big endian.
const SSL_REQUEST: [u8; 8] = [0x00, 0x00, 0x00, 0x08, 0x04, 0xd2, 0x16, 0x2f];

/// PostgreSQL negotiator
pub struct PostgresNegotiator;

impl StarttlsNegotiator for PostgresNegotiator {
    fn negotiate(&self, stream: &mut dyn Stream) -> Result<(), CheckError> {
        let mut conversation = Conversation::new(stream, StarttlsProtocol::Postgres);

        conversation.send(&SSL_REQUEST)?;
        let mut answer = [0u8; 1];
        conversation.read_exact(&mut answer)?;
        match answer[0] {
            b'S' => Ok(()),
            b'N' => Err(conversation.fail("server does not support SSL")),
            other => Err(conversation.fail(format!("unexpected SSLRequest answer: 0x{:02x}", other))),
        }
    }

    fn protocol(&self) -> StarttlsProtocol {
        StarttlsProtocol::Postgres
    }
}
