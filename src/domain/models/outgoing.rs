use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ulid::Ulid;

use super::message::IncomingMessage;
use super::recipient::Recipient;

/// Transport key recorded on placeholder outgoing messages that never matched
/// a transport.
pub const FAILED_TRANSPORT_SENTINEL: &str = "_FAILED_";

/// Lifecycle states of an outgoing message. The codes are stable and stored
/// as-is; reports treat ERROR and TIMEOUT as the error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutgoingMessageStatus {
    /// Created but known to be unsendable.
    NotInitiated,
    /// Constructed by the orchestrator, dispatch pending.
    Initiated,
    /// Accepted by a transport for deferred transmission.
    Queued,
    /// Handed to the vendor network.
    Transmitted,
    /// Confirmed received by the target device, where the vendor can tell.
    Delivered,
    /// Confirmed seen, where the vendor can tell.
    Read,
    /// Acknowledged by the recipient, where the vendor can tell.
    Ack,
    /// Delivery failed.
    Error,
    /// Dispatch exceeded the orchestrator's send timeout.
    Timeout,
}

impl OutgoingMessageStatus {
    pub fn code(&self) -> i32 {
        match self {
            OutgoingMessageStatus::NotInitiated => -2,
            OutgoingMessageStatus::Initiated => -1,
            OutgoingMessageStatus::Queued => 0,
            OutgoingMessageStatus::Transmitted => 10,
            OutgoingMessageStatus::Delivered => 20,
            OutgoingMessageStatus::Read => 30,
            OutgoingMessageStatus::Ack => 40,
            OutgoingMessageStatus::Error => 100,
            OutgoingMessageStatus::Timeout => 101,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -2 => Some(OutgoingMessageStatus::NotInitiated),
            -1 => Some(OutgoingMessageStatus::Initiated),
            0 => Some(OutgoingMessageStatus::Queued),
            10 => Some(OutgoingMessageStatus::Transmitted),
            20 => Some(OutgoingMessageStatus::Delivered),
            30 => Some(OutgoingMessageStatus::Read),
            40 => Some(OutgoingMessageStatus::Ack),
            100 => Some(OutgoingMessageStatus::Error),
            101 => Some(OutgoingMessageStatus::Timeout),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutgoingMessageStatus::NotInitiated => "NOT_INITIATED",
            OutgoingMessageStatus::Initiated => "INITIATED",
            OutgoingMessageStatus::Queued => "QUEUED",
            OutgoingMessageStatus::Transmitted => "TRANSMITTED",
            OutgoingMessageStatus::Delivered => "DELIVERED",
            OutgoingMessageStatus::Read => "READ",
            OutgoingMessageStatus::Ack => "ACK",
            OutgoingMessageStatus::Error => "ERROR",
            OutgoingMessageStatus::Timeout => "TIMEOUT",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            OutgoingMessageStatus::Error | OutgoingMessageStatus::Timeout
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OutgoingMessageStatus::Transmitted
                | OutgoingMessageStatus::Delivered
                | OutgoingMessageStatus::Read
                | OutgoingMessageStatus::Ack
                | OutgoingMessageStatus::Error
                | OutgoingMessageStatus::Timeout
        )
    }
}

/// One (recipient, transport) delivery attempt for an incoming message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub id: Ulid,
    pub transport_key: String,
    pub message: IncomingMessage,
    pub recipient: Recipient,
}

impl OutgoingMessage {
    pub fn for_transport(
        recipient: Recipient,
        message: IncomingMessage,
        transport_key: impl Into<String>,
    ) -> Self {
        Self {
            id: Ulid::new(),
            transport_key: transport_key.into(),
            message,
            recipient,
        }
    }

    /// Placeholder for a recipient no transport could be selected for, so the
    /// failure still shows up in the trail.
    pub fn failure(recipient: Recipient, message: IncomingMessage) -> Self {
        Self::for_transport(recipient, message, FAILED_TRANSPORT_SENTINEL)
    }

    pub fn is_failure(&self) -> bool {
        self.transport_key == FAILED_TRANSPORT_SENTINEL
    }
}

/// Append-only status event. Never updated, never deleted; the delivery
/// history of a message is the ordered set of its events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessageEventRecord {
    /// Sortable: zero-padded epoch milliseconds, a dash, then twelve hex
    /// characters hashed from the outgoing id, the status and random bytes.
    pub id: String,
    pub outgoing_message_id: Ulid,
    pub recorded_at: DateTime<Utc>,
    pub status: OutgoingMessageStatus,
    pub incoming_message_id: Option<Ulid>,
    pub recipient_id: Option<Ulid>,
    pub transport_key: Option<String>,
}

impl OutgoingMessageEventRecord {
    pub fn new(
        recorded_at: DateTime<Utc>,
        outgoing_message_id: Ulid,
        status: OutgoingMessageStatus,
        incoming_message_id: Option<Ulid>,
        recipient_id: Option<Ulid>,
        transport_key: Option<String>,
    ) -> Self {
        Self {
            id: generate_event_id(recorded_at, outgoing_message_id, status),
            outgoing_message_id,
            recorded_at,
            status,
            incoming_message_id,
            recipient_id,
            transport_key,
        }
    }

    pub fn for_outgoing(
        recorded_at: DateTime<Utc>,
        message: &OutgoingMessage,
        status: OutgoingMessageStatus,
    ) -> Self {
        Self::new(
            recorded_at,
            message.id,
            status,
            Some(message.message.id),
            Some(message.recipient.id()),
            Some(message.transport_key.clone()),
        )
    }

    /// Latest event per outgoing message, by maximum event id. The current
    /// status of an outgoing message is derived from this, never stored.
    pub fn latest_per_outgoing(
        records: &[OutgoingMessageEventRecord],
    ) -> HashMap<Ulid, &OutgoingMessageEventRecord> {
        let mut latest: HashMap<Ulid, &OutgoingMessageEventRecord> = HashMap::new();
        for record in records {
            latest
                .entry(record.outgoing_message_id)
                .and_modify(|current| {
                    if record.id > current.id {
                        *current = record;
                    }
                })
                .or_insert(record);
        }
        latest
    }
}

fn generate_event_id(
    recorded_at: DateTime<Utc>,
    outgoing_message_id: Ulid,
    status: OutgoingMessageStatus,
) -> String {
    let millis = recorded_at.timestamp_millis().max(0);
    let nonce: [u8; 8] = rand::random();

    let mut hasher = Sha256::new();
    hasher.update(outgoing_message_id.to_string().as_bytes());
    hasher.update(status.code().to_string().as_bytes());
    hasher.update(nonce);
    let digest = hasher.finalize();

    let suffix: String = digest[..6].iter().map(|b| format!("{b:02x}")).collect();
    format!("{millis:015}-{suffix}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::domain::models::message::Priority;

    fn outgoing() -> OutgoingMessage {
        let message = IncomingMessage::new(
            Utc::now(),
            Ulid::new(),
            vec![Ulid::new()],
            "water leak in the basement",
            Priority::High,
        )
        .unwrap();
        let recipient = Recipient::Person(crate::domain::models::recipient::Person::new("ada"));
        OutgoingMessage::for_transport(recipient, message, "ntfy-main")
    }

    #[test]
    fn event_ids_have_the_documented_shape() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let record = OutgoingMessageEventRecord::new(
            at,
            Ulid::new(),
            OutgoingMessageStatus::Transmitted,
            None,
            None,
            None,
        );

        let (timestamp, suffix) = record.id.split_once('-').unwrap();
        assert_eq!(timestamp.len(), 15);
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), 12);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(timestamp.parse::<i64>().unwrap(), at.timestamp_millis());
    }

    #[test]
    fn event_ids_sort_by_recorded_instant() {
        let outgoing_id = Ulid::new();
        let earlier = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let later = earlier + chrono::Duration::milliseconds(1);

        let first = OutgoingMessageEventRecord::new(
            earlier,
            outgoing_id,
            OutgoingMessageStatus::Initiated,
            None,
            None,
            None,
        );
        let second = OutgoingMessageEventRecord::new(
            later,
            outgoing_id,
            OutgoingMessageStatus::Transmitted,
            None,
            None,
            None,
        );

        assert!(first.id < second.id);
    }

    #[test]
    fn latest_event_wins_per_outgoing_message() {
        let message = outgoing();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        let initiated = OutgoingMessageEventRecord::for_outgoing(
            base,
            &message,
            OutgoingMessageStatus::Initiated,
        );
        let transmitted = OutgoingMessageEventRecord::for_outgoing(
            base + chrono::Duration::seconds(1),
            &message,
            OutgoingMessageStatus::Transmitted,
        );
        let records = vec![transmitted.clone(), initiated];

        let latest = OutgoingMessageEventRecord::latest_per_outgoing(&records);
        assert_eq!(
            latest.get(&message.id).map(|r| r.status),
            Some(OutgoingMessageStatus::Transmitted)
        );
    }

    #[test]
    fn failure_placeholders_carry_the_sentinel_key() {
        let message = outgoing();
        let failure = OutgoingMessage::failure(message.recipient.clone(), message.message.clone());
        assert!(failure.is_failure());
        assert_eq!(failure.transport_key, FAILED_TRANSPORT_SENTINEL);
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [
            OutgoingMessageStatus::NotInitiated,
            OutgoingMessageStatus::Initiated,
            OutgoingMessageStatus::Queued,
            OutgoingMessageStatus::Transmitted,
            OutgoingMessageStatus::Delivered,
            OutgoingMessageStatus::Read,
            OutgoingMessageStatus::Ack,
            OutgoingMessageStatus::Error,
            OutgoingMessageStatus::Timeout,
        ] {
            assert_eq!(OutgoingMessageStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(OutgoingMessageStatus::from_code(55), None);
    }

    #[test]
    fn error_class_covers_error_and_timeout_only() {
        assert!(OutgoingMessageStatus::Error.is_error());
        assert!(OutgoingMessageStatus::Timeout.is_error());
        assert!(!OutgoingMessageStatus::Transmitted.is_error());
        assert!(!OutgoingMessageStatus::Queued.is_error());
    }
}
