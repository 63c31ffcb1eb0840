use std::sync::Arc;

use ulid::Ulid;

use crate::{
    application::services::event_bus::MessageBus,
    domain::{
        events::ProcessIncomingMessage,
        models::{IncomingMessage, Priority},
        repositories::{Clock, IncomingMessageRepository},
    },
};

/// Accepts a message and queues it for addressing. Addressing itself happens
/// asynchronously; acceptance only validates and persists.
pub struct SendMessageUseCase {
    messages: Arc<dyn IncomingMessageRepository>,
    bus: Arc<dyn MessageBus>,
    clock: Arc<dyn Clock>,
}

pub struct SendMessageRequest {
    pub sent_by: Ulid,
    pub to: Vec<Ulid>,
    pub body: String,
    pub priority: Priority,
}

pub struct SendMessageResponse {
    pub message_id: Ulid,
}

impl SendMessageUseCase {
    pub fn new(
        messages: Arc<dyn IncomingMessageRepository>,
        bus: Arc<dyn MessageBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            bus,
            clock,
        }
    }

    pub async fn execute(&self, request: SendMessageRequest) -> anyhow::Result<SendMessageResponse> {
        let message = IncomingMessage::new(
            self.clock.now(),
            request.sent_by,
            request.to,
            request.body,
            request.priority,
        )?;

        self.messages.add(&message).await?;
        self.bus.publish(ProcessIncomingMessage::new(message.id)).await?;

        Ok(SendMessageResponse {
            message_id: message.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::repositories::in_memory::InMemoryIncomingMessageRepository;

    #[derive(Default)]
    struct RecordingBus {
        published: Mutex<Vec<ProcessIncomingMessage>>,
    }

    #[async_trait]
    impl MessageBus for RecordingBus {
        async fn publish(&self, event: ProcessIncomingMessage) -> anyhow::Result<()> {
            self.published.lock().await.push(event);
            Ok(())
        }
    }

    fn usecase() -> (
        SendMessageUseCase,
        Arc<InMemoryIncomingMessageRepository>,
        Arc<RecordingBus>,
    ) {
        let messages = Arc::new(InMemoryIncomingMessageRepository::new());
        let bus = Arc::new(RecordingBus::default());
        (
            SendMessageUseCase::new(messages.clone(), bus.clone(), Arc::new(SystemClock)),
            messages,
            bus,
        )
    }

    #[tokio::test]
    async fn accepted_messages_are_stored_and_announced() {
        let (usecase, messages, bus) = usecase();

        let response = usecase
            .execute(SendMessageRequest {
                sent_by: Ulid::new(),
                to: vec![Ulid::new()],
                body: "boiler pressure high".into(),
                priority: Priority::Urgent,
            })
            .await
            .unwrap();

        let stored = messages.get(response.message_id).await.unwrap();
        assert!(stored.is_some());

        let published = bus.published.lock().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].incoming_message_id, response.message_id);
    }

    #[tokio::test]
    async fn invalid_messages_are_rejected_before_anything_happens() {
        let (usecase, messages, bus) = usecase();

        let outcome = usecase
            .execute(SendMessageRequest {
                sent_by: Ulid::new(),
                to: vec![],
                body: "nobody to tell".into(),
                priority: Priority::Default,
            })
            .await;

        assert!(outcome.is_err());
        let (stored, _) = messages.list(None, None, 10, 0).await.unwrap();
        assert!(stored.is_empty());
        assert!(bus.published.lock().await.is_empty());
    }
}
