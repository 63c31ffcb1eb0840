use std::collections::HashMap;
use std::sync::Arc;

use ulid::Ulid;

use crate::domain::{
    models::{IncomingMessage, OutgoingMessageEventRecord, OutgoingMessageStatus},
    repositories::{IncomingMessageRepository, OutgoingMessageEventRepository},
};

/// One outgoing message with its complete, ordered event history.
pub struct OutgoingDelivery {
    pub outgoing_message_id: Ulid,
    pub recipient_id: Option<Ulid>,
    pub transport_key: Option<String>,
    pub status: OutgoingMessageStatus,
    pub events: Vec<OutgoingMessageEventRecord>,
}

pub struct MessageDetail {
    pub message: IncomingMessage,
    pub deliveries: Vec<OutgoingDelivery>,
}

pub struct GetMessageDetailUseCase {
    messages: Arc<dyn IncomingMessageRepository>,
    events: Arc<dyn OutgoingMessageEventRepository>,
}

impl GetMessageDetailUseCase {
    pub fn new(
        messages: Arc<dyn IncomingMessageRepository>,
        events: Arc<dyn OutgoingMessageEventRepository>,
    ) -> Self {
        Self { messages, events }
    }

    pub async fn execute(&self, message_id: Ulid) -> anyhow::Result<Option<MessageDetail>> {
        let Some(message) = self.messages.get(message_id).await? else {
            return Ok(None);
        };

        let records = self.events.list_for_incoming(message_id).await?;

        // Group by outgoing message, first event decides the display order.
        let mut grouped: HashMap<Ulid, Vec<OutgoingMessageEventRecord>> = HashMap::new();
        let mut order: Vec<Ulid> = Vec::new();
        for record in records {
            let entry = grouped.entry(record.outgoing_message_id).or_default();
            if entry.is_empty() {
                order.push(record.outgoing_message_id);
            }
            entry.push(record);
        }

        let mut deliveries = Vec::with_capacity(order.len());
        for outgoing_message_id in order {
            let events = grouped
                .remove(&outgoing_message_id)
                .unwrap_or_default();
            let Some(latest) = events.last() else {
                continue;
            };
            deliveries.push(OutgoingDelivery {
                outgoing_message_id,
                recipient_id: latest.recipient_id,
                transport_key: latest.transport_key.clone(),
                status: latest.status,
                events,
            });
        }

        Ok(Some(MessageDetail { message, deliveries }))
    }
}
