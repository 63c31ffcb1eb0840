use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Job event carried by the message bus: address and dispatch one previously
/// persisted incoming message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessIncomingMessage {
    pub incoming_message_id: Ulid,
}

impl ProcessIncomingMessage {
    pub fn new(incoming_message_id: Ulid) -> Self {
        Self {
            incoming_message_id,
        }
    }
}
