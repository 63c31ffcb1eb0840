use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::domain::models::{
    IncomingMessage, OutgoingMessageEventRecord, Recipient, TransportConfiguration,
};

#[async_trait]
pub trait RecipientRepository: Send + Sync {
    async fn get(&self, id: Ulid) -> anyhow::Result<Option<Recipient>>;
    async fn add(&self, recipient: &Recipient) -> anyhow::Result<()>;
    async fn update(&self, recipient: &Recipient) -> anyhow::Result<()>;
    async fn remove(&self, id: Ulid) -> anyhow::Result<()>;
}

#[async_trait]
pub trait TransportConfigurationRepository: Send + Sync {
    async fn get_by_key(&self, key: &str) -> anyhow::Result<Option<TransportConfiguration>>;
    async fn list_enabled(&self) -> anyhow::Result<Vec<TransportConfiguration>>;
    async fn add(&self, configuration: &TransportConfiguration) -> anyhow::Result<()>;
    async fn update(&self, configuration: &TransportConfiguration) -> anyhow::Result<()>;
}

#[async_trait]
pub trait IncomingMessageRepository: Send + Sync {
    async fn add(&self, message: &IncomingMessage) -> anyhow::Result<()>;
    async fn get(&self, id: Ulid) -> anyhow::Result<Option<IncomingMessage>>;

    /// Newest first, optionally filtered by sender and a body substring.
    /// The boolean reports whether more rows exist past the window.
    async fn list(
        &self,
        sent_by: Option<Ulid>,
        search: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<(Vec<IncomingMessage>, bool)>;
}

#[async_trait]
pub trait OutgoingMessageEventRepository: Send + Sync {
    /// Append-only. Records are never updated or deleted.
    async fn append(&self, record: &OutgoingMessageEventRecord) -> anyhow::Result<()>;

    /// Every event belonging to any outgoing message of the given incoming
    /// message, ordered by event id.
    async fn list_for_incoming(
        &self,
        incoming_message_id: Ulid,
    ) -> anyhow::Result<Vec<OutgoingMessageEventRecord>>;

    /// Events of one outgoing message, ordered by event id.
    async fn list_for_outgoing(
        &self,
        outgoing_message_id: Ulid,
    ) -> anyhow::Result<Vec<OutgoingMessageEventRecord>>;

    /// ERROR and TIMEOUT events recorded at or after the given instant, or
    /// all of them when no instant is given.
    async fn count_errors_since(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<u64>;
}

/// Injectable time source so addressing runs are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
