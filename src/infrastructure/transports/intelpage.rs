use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::warn;

use crate::{
    application::services::{
        event_trail::EventTrail,
        transports::{Transport, TransportFactory},
    },
    domain::models::{
        IncomingMessage, OutgoingMessage, OutgoingMessageStatus, Priority, Recipient,
        RecipientTransportConfiguration, TransportConfiguration,
    },
};

pub const INTELPAGE_TRANSPORT: &str = "intelpage";

/// Pager hardware rejects longer frames.
pub const MAX_PAGER_MESSAGE_LENGTH: usize = 512;

const CAP_CODE_MIN: i64 = 1;
const CAP_CODE_MAX: i64 = 9999;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ALERT_FROM_PRIORITY: Priority = Priority::High;

/// Hardware pagers behind an IntelPage transmitter appliance. The system
/// configuration locates the transmitter (`host`, `port`); recipients carry a
/// `capCode`, optionally a louder `alertCapCode` used from `alertFromPriority`
/// upwards.
pub struct IntelPageTransport {
    key: String,
    host: Option<String>,
    port: Option<u16>,
    connect_timeout: Duration,
    trail: EventTrail,
}

impl IntelPageTransport {
    fn cap_for(&self, recipient: &Recipient, message: &IncomingMessage) -> Option<i64> {
        let configuration = recipient.transport_configuration_for(&self.key)?;
        let cap = valid_cap(configuration.vendor_i64("capCode"))?;

        if message.priority >= alert_from_priority(configuration) {
            if let Some(alert_cap) = valid_cap(configuration.vendor_i64("alertCapCode")) {
                return Some(alert_cap);
            }
        }
        Some(cap)
    }

    async fn transmit(&self, host: &str, port: u16, frame: &[u8]) -> anyhow::Result<()> {
        let mut stream = timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                anyhow::anyhow!("transmitter {host}:{port} did not accept the connection in time")
            })??;
        stream.write_all(frame).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl Transport for IntelPageTransport {
    fn key(&self) -> &str {
        &self.key
    }

    fn accepts_new_messages(&self) -> bool {
        self.host.is_some() && self.port.is_some()
    }

    fn can_send_to(&self, recipient: &Recipient, message: &IncomingMessage) -> bool {
        if message.body.len() > MAX_PAGER_MESSAGE_LENGTH || !message.body.is_ascii() {
            return false;
        }
        self.cap_for(recipient, message).is_some()
    }

    async fn send(&self, message: &OutgoingMessage) -> anyhow::Result<()> {
        let cap = self.cap_for(&message.recipient, &message.message);
        let (Some(host), Some(port), Some(cap)) = (self.host.as_deref(), self.port, cap) else {
            warn!(outgoing = %message.id, key = %self.key, "transmitter address or cap code missing");
            self.trail
                .record(message, OutgoingMessageStatus::Error)
                .await?;
            return Ok(());
        };

        self.trail
            .record(message, OutgoingMessageStatus::Queued)
            .await?;

        let frame = format!("{cap}\r{}\r\r", message.message.body);
        match self.transmit(host, port, frame.as_bytes()).await {
            Ok(()) => {
                self.trail
                    .record(message, OutgoingMessageStatus::Transmitted)
                    .await?;
            }
            Err(e) => {
                warn!(outgoing = %message.id, cap, "pager transmission failed: {e}");
                self.trail
                    .record(message, OutgoingMessageStatus::Error)
                    .await?;
            }
        }
        Ok(())
    }
}

fn valid_cap(code: Option<i64>) -> Option<i64> {
    code.filter(|code| (CAP_CODE_MIN..=CAP_CODE_MAX).contains(code))
}

fn alert_from_priority(configuration: &RecipientTransportConfiguration) -> Priority {
    let Some(name) = configuration.vendor_str("alertFromPriority") else {
        return DEFAULT_ALERT_FROM_PRIORITY;
    };
    match Priority::from_name(&name) {
        Some(priority) => priority,
        None => {
            warn!(
                configuration = %configuration.id,
                "unknown alertFromPriority '{name}', falling back to {}",
                DEFAULT_ALERT_FROM_PRIORITY.as_str()
            );
            DEFAULT_ALERT_FROM_PRIORITY
        }
    }
}

pub struct IntelPageTransportFactory {
    trail: EventTrail,
}

impl IntelPageTransportFactory {
    pub fn new(trail: EventTrail) -> Arc<dyn TransportFactory> {
        Arc::new(Self { trail }) as Arc<dyn TransportFactory>
    }
}

impl TransportFactory for IntelPageTransportFactory {
    fn supports(&self, transport: &str) -> bool {
        transport == INTELPAGE_TRANSPORT
    }

    fn with_system_configuration(
        &self,
        configuration: TransportConfiguration,
    ) -> Arc<dyn Transport> {
        let connect_timeout = configuration
            .vendor_i64("connectTimeoutSecs")
            .and_then(|secs| u64::try_from(secs).ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        Arc::new(IntelPageTransport {
            key: configuration.key.clone(),
            host: configuration.vendor_str("host"),
            port: configuration
                .vendor_i64("port")
                .and_then(|port| u16::try_from(port).ok()),
            connect_timeout: Duration::from_secs(connect_timeout),
            trail: self.trail.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use ulid::Ulid;

    use super::*;
    use crate::domain::models::Person;
    use crate::domain::repositories::{Clock, OutgoingMessageEventRepository};
    use crate::infrastructure::clock::SystemClock;
    use crate::infrastructure::repositories::in_memory::InMemoryOutgoingMessageEventRepository;

    fn transport_at(
        events: Arc<InMemoryOutgoingMessageEventRepository>,
        host: &str,
        port: u16,
    ) -> Arc<dyn Transport> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let factory = IntelPageTransportFactory::new(EventTrail::new(events, clock));
        let mut configuration =
            TransportConfiguration::new("pager-house", INTELPAGE_TRANSPORT, "House pagers")
                .unwrap();
        configuration.vendor_config = Some(json!({
            "host": host,
            "port": port,
            "connectTimeoutSecs": 1,
        }));
        factory.with_system_configuration(configuration)
    }

    fn recipient_with(vendor: serde_json::Value) -> Recipient {
        let mut person = Person::new("linus");
        person.transport_configurations =
            vec![RecipientTransportConfiguration::new("pager-house", vendor).unwrap()];
        Recipient::Person(person)
    }

    fn message_for(recipient: Recipient, body: &str, priority: Priority) -> OutgoingMessage {
        let incoming = IncomingMessage::new(
            Utc::now(),
            Ulid::new(),
            vec![recipient.id()],
            body,
            priority,
        )
        .unwrap();
        OutgoingMessage::for_transport(recipient, incoming, "pager-house")
    }

    #[tokio::test]
    async fn oversized_or_non_ascii_bodies_are_rejected() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let transport = transport_at(events, "127.0.0.1", 1);
        let recipient = recipient_with(json!({ "capCode": 17 }));

        let fits = message_for(recipient.clone(), "ok", Priority::Default);
        let too_long = message_for(
            recipient.clone(),
            &"x".repeat(MAX_PAGER_MESSAGE_LENGTH + 1),
            Priority::Default,
        );
        let non_ascii = message_for(recipient.clone(), "schön wäre es", Priority::Default);

        assert!(transport.can_send_to(&recipient, &fits.message));
        assert!(!transport.can_send_to(&recipient, &too_long.message));
        assert!(!transport.can_send_to(&recipient, &non_ascii.message));
    }

    #[tokio::test]
    async fn cap_codes_outside_bounds_do_not_qualify() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let transport = transport_at(events, "127.0.0.1", 1);

        let in_bounds = recipient_with(json!({ "capCode": 9999 }));
        let out_of_bounds = recipient_with(json!({ "capCode": 10000 }));
        let missing = recipient_with(json!({}));
        let probe = message_for(in_bounds.clone(), "ping", Priority::Default);

        assert!(transport.can_send_to(&in_bounds, &probe.message));
        assert!(!transport.can_send_to(&out_of_bounds, &probe.message));
        assert!(!transport.can_send_to(&missing, &probe.message));
    }

    #[tokio::test]
    async fn urgent_messages_page_the_alert_cap() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let transport = transport_at(events.clone(), "127.0.0.1", address.port());

        let received = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut bytes = Vec::new();
            socket.read_to_end(&mut bytes).await.unwrap();
            bytes
        });

        let recipient = recipient_with(json!({ "capCode": 17, "alertCapCode": 917 }));
        let message = message_for(recipient, "reactor scram", Priority::Urgent);
        transport.send(&message).await.unwrap();

        assert_eq!(received.await.unwrap(), b"917\rreactor scram\r\r");
        let trail = events.list_for_outgoing(message.id).await.unwrap();
        let statuses: Vec<_> = trail.iter().map(|record| record.status).collect();
        assert_eq!(
            statuses,
            vec![
                OutgoingMessageStatus::Queued,
                OutgoingMessageStatus::Transmitted
            ]
        );
    }

    #[tokio::test]
    async fn routine_messages_page_the_regular_cap() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let transport = transport_at(events, "127.0.0.1", address.port());

        let received = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut bytes = Vec::new();
            socket.read_to_end(&mut bytes).await.unwrap();
            bytes
        });

        let recipient = recipient_with(json!({ "capCode": 17, "alertCapCode": 917 }));
        let message = message_for(recipient, "lunch is ready", Priority::Low);
        transport.send(&message).await.unwrap();

        assert_eq!(received.await.unwrap(), b"17\rlunch is ready\r\r");
    }

    #[tokio::test]
    async fn an_unreachable_transmitter_records_an_error() {
        let events = Arc::new(InMemoryOutgoingMessageEventRepository::new());
        // Bind and drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let transport = transport_at(events.clone(), "127.0.0.1", port);

        let recipient = recipient_with(json!({ "capCode": 42 }));
        let message = message_for(recipient, "anyone there", Priority::Default);
        transport.send(&message).await.unwrap();

        let trail = events.list_for_outgoing(message.id).await.unwrap();
        let statuses: Vec<_> = trail.iter().map(|record| record.status).collect();
        assert_eq!(
            statuses,
            vec![OutgoingMessageStatus::Queued, OutgoingMessageStatus::Error]
        );
    }

    #[test]
    fn alert_from_priority_defaults_to_high() {
        let plain = RecipientTransportConfiguration::new("pager-house", json!({})).unwrap();
        assert_eq!(alert_from_priority(&plain), Priority::High);

        let explicit = RecipientTransportConfiguration::new(
            "pager-house",
            json!({ "alertFromPriority": "URGENT" }),
        )
        .unwrap();
        assert_eq!(alert_from_priority(&explicit), Priority::Urgent);

        let garbage = RecipientTransportConfiguration::new(
            "pager-house",
            json!({ "alertFromPriority": "LOUD" }),
        )
        .unwrap();
        assert_eq!(alert_from_priority(&garbage), Priority::High);
    }
}
