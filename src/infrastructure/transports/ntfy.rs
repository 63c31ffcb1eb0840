use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::warn;

use crate::{
    application::services::{
        event_trail::EventTrail,
        transports::{Transport, TransportFactory},
    },
    domain::models::{
        IncomingMessage, OutgoingMessage, OutgoingMessageStatus, Priority, Recipient,
        TransportConfiguration,
    },
};

pub const NTFY_TRANSPORT: &str = "ntfy";

/// Push notifications through an ntfy server. The system configuration names
/// the server (`serverUrl`, optional `accessToken`); each recipient supplies
/// the `topic` their devices subscribe to.
pub struct NtfyTransport {
    key: String,
    server_url: Option<String>,
    access_token: Option<String>,
    http: Client,
    trail: EventTrail,
}

#[async_trait]
impl Transport for NtfyTransport {
    fn key(&self) -> &str {
        &self.key
    }

    fn accepts_new_messages(&self) -> bool {
        self.server_url.is_some()
    }

    fn can_send_to(&self, recipient: &Recipient, _message: &IncomingMessage) -> bool {
        recipient
            .transport_configuration_for(&self.key)
            .and_then(|c| c.vendor_str("topic"))
            .is_some()
    }

    async fn send(&self, message: &OutgoingMessage) -> anyhow::Result<()> {
        let topic = message
            .recipient
            .transport_configuration_for(&message.transport_key)
            .and_then(|c| c.vendor_str("topic"));
        let (Some(server_url), Some(topic)) = (self.server_url.as_deref(), topic) else {
            warn!(outgoing = %message.id, key = %self.key, "ntfy server url or topic missing");
            self.trail
                .record(message, OutgoingMessageStatus::Error)
                .await?;
            return Ok(());
        };

        let url = format!("{}/{topic}", server_url.trim_end_matches('/'));
        let mut request = self
            .http
            .post(&url)
            .header("X-Priority", ntfy_priority(message.message.priority))
            .body(message.message.body.clone());
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                self.trail
                    .record(message, OutgoingMessageStatus::Transmitted)
                    .await?;
            }
            Ok(response) => {
                warn!(
                    outgoing = %message.id,
                    status = %response.status(),
                    "ntfy rejected the notification"
                );
                self.trail
                    .record(message, OutgoingMessageStatus::Error)
                    .await?;
            }
            Err(e) => {
                warn!(outgoing = %message.id, "ntfy request failed: {e}");
                self.trail
                    .record(message, OutgoingMessageStatus::Error)
                    .await?;
            }
        }
        Ok(())
    }
}

/// ntfy priorities run 1 (min) to 5 (max).
fn ntfy_priority(priority: Priority) -> &'static str {
    match priority {
        Priority::Min => "1",
        Priority::Low => "2",
        Priority::Default => "3",
        Priority::High => "4",
        Priority::Urgent => "5",
    }
}

pub struct NtfyTransportFactory {
    http: Client,
    trail: EventTrail,
}

impl NtfyTransportFactory {
    pub fn new(trail: EventTrail) -> Arc<dyn TransportFactory> {
        Arc::new(Self {
            http: Client::builder()
                .user_agent("paging-service/ntfy")
                .build()
                .expect("failed to build ntfy client"),
            trail,
        }) as Arc<dyn TransportFactory>
    }
}

impl TransportFactory for NtfyTransportFactory {
    fn supports(&self, transport: &str) -> bool {
        transport == NTFY_TRANSPORT
    }

    fn with_system_configuration(
        &self,
        configuration: TransportConfiguration,
    ) -> Arc<dyn Transport> {
        Arc::new(NtfyTransport {
            key: configuration.key.clone(),
            server_url: configuration.vendor_str("serverUrl"),
            access_token: configuration.vendor_str("accessToken"),
            http: self.http.clone(),
            trail: self.trail.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use ulid::Ulid;

    use super::*;
    use crate::domain::models::{Person, RecipientTransportConfiguration};
    use crate::domain::repositories::{Clock, OutgoingMessageEventRepository};
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::repositories::in_memory::InMemoryOutgoingMessageEventRepository;

    fn transport_with(
        events: Arc<InMemoryOutgoingMessageEventRepository>,
        server_url: Option<&str>,
    ) -> Arc<dyn Transport> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let factory = NtfyTransportFactory::new(EventTrail::new(events, clock));
        let mut configuration =
            TransportConfiguration::new("ntfy-main", NTFY_TRANSPORT, "Main ntfy").unwrap();
        configuration.vendor_config = server_url.map(|url| json!({ "serverUrl": url }));
        factory.with_system_configuration(configuration)
    }

    fn recipient_with_topic(topic: Option<&str>) -> Recipient {
        let mut person = Person::new("ada");
        let vendor = match topic {
            Some(topic) => json!({ "topic": topic }),
            None => json!({}),
        };
        person.transport_configurations =
            vec![RecipientTransportConfiguration::new("ntfy-main", vendor).unwrap()];
        Recipient::Person(person)
    }

    fn message_for(recipient: Recipient) -> OutgoingMessage {
        let incoming = IncomingMessage::new(
            Utc::now(),
            Ulid::new(),
            vec![recipient.id()],
            "boiler pressure high",
            Priority::Urgent,
        )
        .unwrap();
        OutgoingMessage::for_transport(recipient, incoming, "ntfy-main")
    }

    #[test]
    fn priorities_map_to_the_ntfy_scale() {
        assert_eq!(ntfy_priority(Priority::Min), "1");
        assert_eq!(ntfy_priority(Priority::Low), "2");
        assert_eq!(ntfy_priority(Priority::Default), "3");
        assert_eq!(ntfy_priority(Priority::High), "4");
        assert_eq!(ntfy_priority(Priority::Urgent), "5");
    }

    #[tokio::test]
    async fn a_server_url_is_required_to_accept_messages() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        assert!(transport_with(events.clone(), Some("https://ntfy.example.org")).accepts_new_messages());
        assert!(!transport_with(events, None).accepts_new_messages());
    }

    #[tokio::test]
    async fn recipients_need_a_topic() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let transport = transport_with(events, Some("https://ntfy.example.org"));

        let with_topic = recipient_with_topic(Some("ada-alerts"));
        let without_topic = recipient_with_topic(None);
        let probe = message_for(with_topic.clone());

        assert!(transport.can_send_to(&with_topic, &probe.message));
        assert!(!transport.can_send_to(&without_topic, &probe.message));
    }

    #[tokio::test]
    async fn sending_without_a_topic_records_an_error_instead_of_failing() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let transport = transport_with(events.clone(), Some("https://ntfy.example.org"));
        let message = message_for(recipient_with_topic(None));

        transport.send(&message).await.unwrap();

        let trail = events.list_for_outgoing(message.id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].status, OutgoingMessageStatus::Error);
    }
}
