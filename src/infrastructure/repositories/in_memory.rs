use std::collections::HashMap;
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::domain::{
    models::{IncomingMessage, OutgoingMessageEventRecord, Recipient, TransportConfiguration},
    repositories::{
        IncomingMessageRepository, OutgoingMessageEventRepository, RecipientRepository,
        TransportConfigurationRepository,
    },
};

#[derive(Default)]
pub struct InMemoryRecipientRepository {
    recipients: Arc<RwLock<HashMap<Ulid, Recipient>>>,
}

impl InMemoryRecipientRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecipientRepository for InMemoryRecipientRepository {
    async fn get(&self, id: Ulid) -> anyhow::Result<Option<Recipient>> {
        let recipients = self.recipients.read().await;
        Ok(recipients.get(&id).cloned())
    }

    async fn add(&self, recipient: &Recipient) -> anyhow::Result<()> {
        let mut recipients = self.recipients.write().await;
        if recipients.contains_key(&recipient.id()) {
            bail!("recipient {} already exists", recipient.id());
        }
        recipients.insert(recipient.id(), recipient.clone());
        Ok(())
    }

    async fn update(&self, recipient: &Recipient) -> anyhow::Result<()> {
        let mut recipients = self.recipients.write().await;
        if !recipients.contains_key(&recipient.id()) {
            bail!("recipient {} not found", recipient.id());
        }
        recipients.insert(recipient.id(), recipient.clone());
        Ok(())
    }

    async fn remove(&self, id: Ulid) -> anyhow::Result<()> {
        let mut recipients = self.recipients.write().await;
        if recipients.remove(&id).is_none() {
            bail!("recipient {id} not found");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryTransportConfigurationRepository {
    configurations: Arc<RwLock<HashMap<String, TransportConfiguration>>>,
}

impl InMemoryTransportConfigurationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransportConfigurationRepository for InMemoryTransportConfigurationRepository {
    async fn get_by_key(&self, key: &str) -> anyhow::Result<Option<TransportConfiguration>> {
        let configurations = self.configurations.read().await;
        Ok(configurations.get(key).cloned())
    }

    async fn list_enabled(&self) -> anyhow::Result<Vec<TransportConfiguration>> {
        let configurations = self.configurations.read().await;
        let mut enabled: Vec<_> = configurations
            .values()
            .filter(|c| c.enabled)
            .cloned()
            .collect();
        enabled.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(enabled)
    }

    async fn add(&self, configuration: &TransportConfiguration) -> anyhow::Result<()> {
        let mut configurations = self.configurations.write().await;
        if configurations.contains_key(&configuration.key) {
            bail!("transport configuration {} already exists", configuration.key);
        }
        configurations.insert(configuration.key.clone(), configuration.clone());
        Ok(())
    }

    async fn update(&self, configuration: &TransportConfiguration) -> anyhow::Result<()> {
        let mut configurations = self.configurations.write().await;
        if !configurations.contains_key(&configuration.key) {
            bail!("transport configuration {} not found", configuration.key);
        }
        configurations.insert(configuration.key.clone(), configuration.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIncomingMessageRepository {
    messages: Arc<RwLock<HashMap<Ulid, IncomingMessage>>>,
}

impl InMemoryIncomingMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IncomingMessageRepository for InMemoryIncomingMessageRepository {
    async fn add(&self, message: &IncomingMessage) -> anyhow::Result<()> {
        let mut messages = self.messages.write().await;
        if messages.contains_key(&message.id) {
            bail!("incoming message {} already exists", message.id);
        }
        messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn get(&self, id: Ulid) -> anyhow::Result<Option<IncomingMessage>> {
        let messages = self.messages.read().await;
        Ok(messages.get(&id).cloned())
    }

    async fn list(
        &self,
        sent_by: Option<Ulid>,
        search: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<(Vec<IncomingMessage>, bool)> {
        let messages = self.messages.read().await;
        let needle = search.map(str::to_lowercase);
        let mut matching: Vec<_> = messages
            .values()
            .filter(|m| sent_by.is_none_or(|sender| m.sent_by == sender))
            .filter(|m| {
                needle
                    .as_deref()
                    .is_none_or(|n| m.body.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));

        let offset = offset as usize;
        let limit = limit as usize;
        let has_more = matching.len() > offset + limit;
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok((page, has_more))
    }
}

/// Append-only list, never keyed: duplicate ids would be a bug upstream and
/// are kept visible rather than silently collapsed.
#[derive(Default)]
pub struct InMemoryOutgoingMessageEventRepository {
    events: Arc<RwLock<Vec<OutgoingMessageEventRecord>>>,
}

impl InMemoryOutgoingMessageEventRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutgoingMessageEventRepository for InMemoryOutgoingMessageEventRepository {
    async fn append(&self, record: &OutgoingMessageEventRecord) -> anyhow::Result<()> {
        let mut events = self.events.write().await;
        events.push(record.clone());
        Ok(())
    }

    async fn list_for_incoming(
        &self,
        incoming_message_id: Ulid,
    ) -> anyhow::Result<Vec<OutgoingMessageEventRecord>> {
        let events = self.events.read().await;
        let mut matching: Vec<_> = events
            .iter()
            .filter(|e| e.incoming_message_id == Some(incoming_message_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }

    async fn list_for_outgoing(
        &self,
        outgoing_message_id: Ulid,
    ) -> anyhow::Result<Vec<OutgoingMessageEventRecord>> {
        let events = self.events.read().await;
        let mut matching: Vec<_> = events
            .iter()
            .filter(|e| e.outgoing_message_id == outgoing_message_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }

    async fn count_errors_since(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<u64> {
        let events = self.events.read().await;
        let count = events
            .iter()
            .filter(|e| e.status.is_error())
            .filter(|e| since.is_none_or(|s| e.recorded_at >= s))
            .count();
        Ok(count as u64)
    }
}
