use std::sync::Arc;

use ulid::Ulid;

use crate::domain::models::{
    FAILED_TRANSPORT_SENTINEL, IncomingMessage, OutgoingMessage, OutgoingMessageEventRecord,
    OutgoingMessageStatus,
};
use crate::domain::repositories::{Clock, OutgoingMessageEventRepository};

/// Appends delivery status events. Shared by the orchestrator and every
/// transport; the trail is the only place delivery state lives.
#[derive(Clone)]
pub struct EventTrail {
    events: Arc<dyn OutgoingMessageEventRepository>,
    clock: Arc<dyn Clock>,
}

impl EventTrail {
    pub fn new(events: Arc<dyn OutgoingMessageEventRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { events, clock }
    }

    pub async fn record(
        &self,
        message: &OutgoingMessage,
        status: OutgoingMessageStatus,
    ) -> anyhow::Result<OutgoingMessageEventRecord> {
        let record =
            OutgoingMessageEventRecord::for_outgoing(self.clock.now(), message, status);
        self.events.append(&record).await?;
        tracing::debug!(
            event = %record.id,
            outgoing = %message.id,
            transport = %message.transport_key,
            status = status.as_str(),
            "recorded delivery event"
        );
        Ok(record)
    }

    /// Failure marker for an addressed id that no stored recipient matches.
    /// A placeholder outgoing id is minted so the failure shows up in the
    /// trail like any other.
    pub async fn record_unknown_recipient(
        &self,
        message: &IncomingMessage,
        recipient_id: Ulid,
    ) -> anyhow::Result<OutgoingMessageEventRecord> {
        let record = OutgoingMessageEventRecord::new(
            self.clock.now(),
            Ulid::new(),
            OutgoingMessageStatus::Error,
            Some(message.id),
            Some(recipient_id),
            Some(FAILED_TRANSPORT_SENTINEL.to_owned()),
        );
        self.events.append(&record).await?;
        Ok(record)
    }
}
