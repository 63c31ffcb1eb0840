use std::sync::Arc;

use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::domain::{
    models::{IncomingMessage, OutgoingMessageEventRecord, OutgoingMessageStatus},
    repositories::{IncomingMessageRepository, OutgoingMessageEventRepository},
};

/// Current delivery state of one outgoing message, derived from its latest
/// trail event.
#[derive(Debug, Clone)]
pub struct DeliveryStatus {
    pub outgoing_message_id: Ulid,
    pub recipient_id: Option<Ulid>,
    pub transport_key: Option<String>,
    pub status: OutgoingMessageStatus,
    pub recorded_at: DateTime<Utc>,
}

impl DeliveryStatus {
    pub fn from_latest(record: &OutgoingMessageEventRecord) -> Self {
        Self {
            outgoing_message_id: record.outgoing_message_id,
            recipient_id: record.recipient_id,
            transport_key: record.transport_key.clone(),
            status: record.status,
            recorded_at: record.recorded_at,
        }
    }
}

pub struct MessageWithDeliveries {
    pub message: IncomingMessage,
    pub deliveries: Vec<DeliveryStatus>,
}

pub struct GetMessageHistoryUseCase {
    messages: Arc<dyn IncomingMessageRepository>,
    events: Arc<dyn OutgoingMessageEventRepository>,
}

pub struct GetMessageHistoryRequest {
    pub sent_by: Option<Ulid>,
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

pub struct GetMessageHistoryResponse {
    pub entries: Vec<MessageWithDeliveries>,
    pub has_more: bool,
}

impl GetMessageHistoryUseCase {
    pub fn new(
        messages: Arc<dyn IncomingMessageRepository>,
        events: Arc<dyn OutgoingMessageEventRepository>,
    ) -> Self {
        Self { messages, events }
    }

    pub async fn execute(
        &self,
        request: GetMessageHistoryRequest,
    ) -> anyhow::Result<GetMessageHistoryResponse> {
        let (messages, has_more) = self
            .messages
            .list(
                request.sent_by,
                request.search.as_deref(),
                request.limit,
                request.offset,
            )
            .await?;

        let mut entries = Vec::with_capacity(messages.len());
        for message in messages {
            let records = self.events.list_for_incoming(message.id).await?;
            let mut deliveries: Vec<_> = OutgoingMessageEventRecord::latest_per_outgoing(&records)
                .into_values()
                .map(DeliveryStatus::from_latest)
                .collect();
            deliveries.sort_by(|a, b| a.outgoing_message_id.cmp(&b.outgoing_message_id));
            entries.push(MessageWithDeliveries { message, deliveries });
        }

        Ok(GetMessageHistoryResponse { entries, has_more })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::models::{OutgoingMessage, Person, Priority, Recipient};
    use crate::infrastructure::repositories::in_memory::{
        InMemoryIncomingMessageRepository, InMemoryOutgoingMessageEventRepository,
    };

    #[tokio::test]
    async fn each_message_carries_the_latest_state_per_delivery() {
        let messages = Arc::new(InMemoryIncomingMessageRepository::new());
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let usecase = GetMessageHistoryUseCase::new(messages.clone(), events.clone());

        let message = IncomingMessage::new(
            Utc::now(),
            Ulid::new(),
            vec![Ulid::new()],
            "boiler pressure high",
            Priority::Urgent,
        )
        .unwrap();
        messages.add(&message).await.unwrap();

        let recipient = Recipient::Person(Person::new("ada"));
        let outgoing = OutgoingMessage::for_transport(recipient, message.clone(), "ntfy-main");
        let base = Utc.with_ymd_and_hms(2025, 3, 5, 14, 0, 0).unwrap();
        events
            .append(&OutgoingMessageEventRecord::for_outgoing(
                base,
                &outgoing,
                OutgoingMessageStatus::Initiated,
            ))
            .await
            .unwrap();
        events
            .append(&OutgoingMessageEventRecord::for_outgoing(
                base + chrono::Duration::seconds(2),
                &outgoing,
                OutgoingMessageStatus::Transmitted,
            ))
            .await
            .unwrap();

        let response = usecase
            .execute(GetMessageHistoryRequest {
                sent_by: None,
                search: None,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();

        assert_eq!(response.entries.len(), 1);
        assert!(!response.has_more);
        let deliveries = &response.entries[0].deliveries;
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].outgoing_message_id, outgoing.id);
        assert_eq!(deliveries[0].status, OutgoingMessageStatus::Transmitted);
    }

    #[tokio::test]
    async fn messages_without_deliveries_still_appear() {
        let messages = Arc::new(InMemoryIncomingMessageRepository::new());
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let usecase = GetMessageHistoryUseCase::new(messages.clone(), events);

        let message = IncomingMessage::new(
            Utc::now(),
            Ulid::new(),
            vec![Ulid::new()],
            "queued but untouched",
            Priority::Low,
        )
        .unwrap();
        messages.add(&message).await.unwrap();

        let response = usecase
            .execute(GetMessageHistoryRequest {
                sent_by: None,
                search: None,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();

        assert_eq!(response.entries.len(), 1);
        assert!(response.entries[0].deliveries.is_empty());
    }
}
