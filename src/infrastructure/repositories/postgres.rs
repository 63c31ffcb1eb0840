use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Pool, Postgres};
use ulid::Ulid;

use crate::domain::{
    models::{
        Group, IncomingMessage, OutgoingMessageEventRecord, OutgoingMessageStatus, Person,
        Priority, Recipient, RecipientTransportConfiguration, Role, TransportConfiguration,
    },
    repositories::{
        IncomingMessageRepository, OutgoingMessageEventRepository, RecipientRepository,
        TransportConfigurationRepository,
    },
};

pub type PgPool = Pool<Postgres>;

#[derive(Clone)]
pub struct PostgresRecipientRepository {
    pool: PgPool,
}

impl PostgresRecipientRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }

    async fn configurations_of(
        &self,
        recipient_id: &str,
    ) -> anyhow::Result<Vec<RecipientTransportConfiguration>> {
        let records = sqlx::query_as::<_, RecipientConfigurationRecord>(
            r#"
            SELECT id, key, enabled, vendor_config, selection_expression, rank,
                   continue_in_hierarchy, evaluate_other_configurations
            FROM recipient_transport_configurations
            WHERE recipient_id = $1
            ORDER BY position
            "#,
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;
        records.into_iter().map(|record| record.try_into()).collect()
    }
}

#[async_trait]
impl RecipientRepository for PostgresRecipientRepository {
    async fn get(&self, id: Ulid) -> anyhow::Result<Option<Recipient>> {
        let record = sqlx::query_as::<_, RecipientRecord>(
            r#"
            SELECT id, kind, name, delegate_id, member_ids, role_ids
            FROM recipients
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };
        let configurations = self.configurations_of(&record.id).await?;
        Ok(Some(recipient_from_record(record, configurations)?))
    }

    async fn add(&self, recipient: &Recipient) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO recipients (id, kind, name, delegate_id, member_ids, role_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(recipient.id().to_string())
        .bind(recipient.kind())
        .bind(recipient.name())
        .bind(delegate_of(recipient))
        .bind(Json(member_ids_of(recipient)))
        .bind(Json(role_ids_of(recipient)))
        .execute(&mut *tx)
        .await?;

        insert_configurations(&mut tx, recipient).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, recipient: &Recipient) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE recipients
            SET kind = $2, name = $3, delegate_id = $4, member_ids = $5, role_ids = $6
            WHERE id = $1
            "#,
        )
        .bind(recipient.id().to_string())
        .bind(recipient.kind())
        .bind(recipient.name())
        .bind(delegate_of(recipient))
        .bind(Json(member_ids_of(recipient)))
        .bind(Json(role_ids_of(recipient)))
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            anyhow::bail!("recipient {} not found", recipient.id());
        }

        // Configurations are replaced wholesale; they have no identity of
        // their own outside the owning recipient.
        sqlx::query(r#"DELETE FROM recipient_transport_configurations WHERE recipient_id = $1"#)
            .bind(recipient.id().to_string())
            .execute(&mut *tx)
            .await?;
        insert_configurations(&mut tx, recipient).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, id: Ulid) -> anyhow::Result<()> {
        let deleted = sqlx::query(r#"DELETE FROM recipients WHERE id = $1"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            anyhow::bail!("recipient {id} not found");
        }
        Ok(())
    }
}

async fn insert_configurations(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    recipient: &Recipient,
) -> anyhow::Result<()> {
    for (position, configuration) in recipient.transport_configurations().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO recipient_transport_configurations (
                id, recipient_id, position, key, enabled, vendor_config,
                selection_expression, rank, continue_in_hierarchy,
                evaluate_other_configurations
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(configuration.id.to_string())
        .bind(recipient.id().to_string())
        .bind(position as i32)
        .bind(&configuration.key)
        .bind(configuration.enabled)
        .bind(&configuration.vendor_config)
        .bind(&configuration.selection_expression)
        .bind(configuration.rank)
        .bind(configuration.continue_in_hierarchy)
        .bind(configuration.evaluate_other_configurations)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct PostgresTransportConfigurationRepository {
    pool: PgPool,
}

impl PostgresTransportConfigurationRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl TransportConfigurationRepository for PostgresTransportConfigurationRepository {
    async fn get_by_key(&self, key: &str) -> anyhow::Result<Option<TransportConfiguration>> {
        let record = sqlx::query_as::<_, TransportConfigurationRecord>(
            r#"
            SELECT key, transport, title, enabled, vendor_config
            FROM transport_configurations
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record.map(TransportConfiguration::from))
    }

    async fn list_enabled(&self) -> anyhow::Result<Vec<TransportConfiguration>> {
        let records = sqlx::query_as::<_, TransportConfigurationRecord>(
            r#"
            SELECT key, transport, title, enabled, vendor_config
            FROM transport_configurations
            WHERE enabled
            ORDER BY key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(records.into_iter().map(TransportConfiguration::from).collect())
    }

    async fn add(&self, configuration: &TransportConfiguration) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transport_configurations (key, transport, title, enabled, vendor_config)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&configuration.key)
        .bind(&configuration.transport)
        .bind(&configuration.title)
        .bind(configuration.enabled)
        .bind(&configuration.vendor_config)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, configuration: &TransportConfiguration) -> anyhow::Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE transport_configurations
            SET transport = $2, title = $3, enabled = $4, vendor_config = $5
            WHERE key = $1
            "#,
        )
        .bind(&configuration.key)
        .bind(&configuration.transport)
        .bind(&configuration.title)
        .bind(configuration.enabled)
        .bind(&configuration.vendor_config)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            anyhow::bail!("transport configuration {} not found", configuration.key);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresIncomingMessageRepository {
    pool: PgPool,
}

impl PostgresIncomingMessageRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl IncomingMessageRepository for PostgresIncomingMessageRepository {
    async fn add(&self, message: &IncomingMessage) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO incoming_messages (id, sent_at, sent_by, recipient_ids, body, priority)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.sent_at)
        .bind(message.sent_by.to_string())
        .bind(Json(
            message.to.iter().map(Ulid::to_string).collect::<Vec<_>>(),
        ))
        .bind(&message.body)
        .bind(message.priority.value())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Ulid) -> anyhow::Result<Option<IncomingMessage>> {
        let record = sqlx::query_as::<_, IncomingMessageRecord>(
            r#"
            SELECT id, sent_at, sent_by, recipient_ids, body, priority
            FROM incoming_messages
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        record.map(|record| record.try_into()).transpose()
    }

    async fn list(
        &self,
        sent_by: Option<Ulid>,
        search: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<(Vec<IncomingMessage>, bool)> {
        let limit = limit.min(200) as i64;

        // One extra row tells us whether the next page exists.
        let records = sqlx::query_as::<_, IncomingMessageRecord>(
            r#"
            SELECT id, sent_at, sent_by, recipient_ids, body, priority
            FROM incoming_messages
            WHERE ($1::text IS NULL OR sent_by = $1)
              AND ($2::text IS NULL OR body ILIKE '%' || $2 || '%')
            ORDER BY sent_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(sent_by.map(|id| id.to_string()))
        .bind(search)
        .bind(limit + 1)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let has_more = records.len() > limit as usize;
        let messages = records
            .into_iter()
            .take(limit as usize)
            .map(|record| record.try_into())
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((messages, has_more))
    }
}

#[derive(Clone)]
pub struct PostgresOutgoingMessageEventRepository {
    pool: PgPool,
}

impl PostgresOutgoingMessageEventRepository {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

#[async_trait]
impl OutgoingMessageEventRepository for PostgresOutgoingMessageEventRepository {
    async fn append(&self, record: &OutgoingMessageEventRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO outgoing_message_events (
                id, outgoing_message_id, recorded_at, status,
                incoming_message_id, recipient_id, transport_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&record.id)
        .bind(record.outgoing_message_id.to_string())
        .bind(record.recorded_at)
        .bind(record.status.code())
        .bind(record.incoming_message_id.map(|id| id.to_string()))
        .bind(record.recipient_id.map(|id| id.to_string()))
        .bind(&record.transport_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_incoming(
        &self,
        incoming_message_id: Ulid,
    ) -> anyhow::Result<Vec<OutgoingMessageEventRecord>> {
        let records = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, outgoing_message_id, recorded_at, status,
                   incoming_message_id, recipient_id, transport_key
            FROM outgoing_message_events
            WHERE incoming_message_id = $1
            ORDER BY id
            "#,
        )
        .bind(incoming_message_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        records.into_iter().map(|record| record.try_into()).collect()
    }

    async fn list_for_outgoing(
        &self,
        outgoing_message_id: Ulid,
    ) -> anyhow::Result<Vec<OutgoingMessageEventRecord>> {
        let records = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, outgoing_message_id, recorded_at, status,
                   incoming_message_id, recipient_id, transport_key
            FROM outgoing_message_events
            WHERE outgoing_message_id = $1
            ORDER BY id
            "#,
        )
        .bind(outgoing_message_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        records.into_iter().map(|record| record.try_into()).collect()
    }

    async fn count_errors_since(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM outgoing_message_events
            WHERE status IN (100, 101)
              AND ($1::timestamptz IS NULL OR recorded_at >= $1)
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }
}

#[derive(FromRow)]
struct RecipientRecord {
    id: String,
    kind: String,
    name: String,
    delegate_id: Option<String>,
    member_ids: Json<Vec<String>>,
    role_ids: Json<Vec<String>>,
}

#[derive(FromRow)]
struct RecipientConfigurationRecord {
    id: String,
    key: String,
    enabled: bool,
    vendor_config: serde_json::Value,
    selection_expression: Option<String>,
    rank: i32,
    continue_in_hierarchy: Option<bool>,
    evaluate_other_configurations: bool,
}

#[derive(FromRow)]
struct TransportConfigurationRecord {
    key: String,
    transport: String,
    title: String,
    enabled: bool,
    vendor_config: Option<serde_json::Value>,
}

#[derive(FromRow)]
struct IncomingMessageRecord {
    id: String,
    sent_at: DateTime<Utc>,
    sent_by: String,
    recipient_ids: Json<Vec<String>>,
    body: String,
    priority: i32,
}

#[derive(FromRow)]
struct EventRecord {
    id: String,
    outgoing_message_id: String,
    recorded_at: DateTime<Utc>,
    status: i32,
    incoming_message_id: Option<String>,
    recipient_id: Option<String>,
    transport_key: Option<String>,
}

fn recipient_from_record(
    record: RecipientRecord,
    transport_configurations: Vec<RecipientTransportConfiguration>,
) -> anyhow::Result<Recipient> {
    let id = parse_ulid(&record.id)?;
    Ok(match record.kind.as_str() {
        "person" => Recipient::Person(Person {
            id,
            name: record.name,
            transport_configurations,
            role_ids: parse_ulids(&record.role_ids.0)?,
        }),
        "role" => Recipient::Role(Role {
            id,
            name: record.name,
            transport_configurations,
            delegate: record.delegate_id.as_deref().map(parse_ulid).transpose()?,
        }),
        "group" => Recipient::Group(Group {
            id,
            name: record.name,
            transport_configurations,
            member_ids: parse_ulids(&record.member_ids.0)?,
        }),
        other => anyhow::bail!("unknown recipient kind {other}"),
    })
}

impl TryFrom<RecipientConfigurationRecord> for RecipientTransportConfiguration {
    type Error = anyhow::Error;

    fn try_from(value: RecipientConfigurationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_ulid(&value.id)?,
            key: value.key,
            enabled: value.enabled,
            vendor_config: value.vendor_config,
            selection_expression: value.selection_expression,
            rank: value.rank,
            continue_in_hierarchy: value.continue_in_hierarchy,
            evaluate_other_configurations: value.evaluate_other_configurations,
        })
    }
}

impl From<TransportConfigurationRecord> for TransportConfiguration {
    fn from(value: TransportConfigurationRecord) -> Self {
        Self {
            key: value.key,
            transport: value.transport,
            title: value.title,
            enabled: value.enabled,
            vendor_config: value.vendor_config,
        }
    }
}

impl TryFrom<IncomingMessageRecord> for IncomingMessage {
    type Error = anyhow::Error;

    fn try_from(value: IncomingMessageRecord) -> Result<Self, Self::Error> {
        let priority = Priority::from_value(value.priority)
            .ok_or_else(|| anyhow::anyhow!("unknown priority code {}", value.priority))?;
        Ok(Self {
            id: parse_ulid(&value.id)?,
            sent_at: value.sent_at,
            sent_by: parse_ulid(&value.sent_by)?,
            to: parse_ulids(&value.recipient_ids.0)?,
            body: value.body,
            priority,
        })
    }
}

impl TryFrom<EventRecord> for OutgoingMessageEventRecord {
    type Error = anyhow::Error;

    fn try_from(value: EventRecord) -> Result<Self, Self::Error> {
        let status = OutgoingMessageStatus::from_code(value.status)
            .ok_or_else(|| anyhow::anyhow!("unknown status code {}", value.status))?;
        Ok(Self {
            id: value.id,
            outgoing_message_id: parse_ulid(&value.outgoing_message_id)?,
            recorded_at: value.recorded_at,
            status,
            incoming_message_id: value.incoming_message_id.as_deref().map(parse_ulid).transpose()?,
            recipient_id: value.recipient_id.as_deref().map(parse_ulid).transpose()?,
            transport_key: value.transport_key,
        })
    }
}

fn delegate_of(recipient: &Recipient) -> Option<String> {
    match recipient {
        Recipient::Role(role) => role.delegate.map(|id| id.to_string()),
        _ => None,
    }
}

fn member_ids_of(recipient: &Recipient) -> Vec<String> {
    match recipient {
        Recipient::Group(group) => group.member_ids.iter().map(Ulid::to_string).collect(),
        _ => Vec::new(),
    }
}

fn role_ids_of(recipient: &Recipient) -> Vec<String> {
    match recipient {
        Recipient::Person(person) => person.role_ids.iter().map(Ulid::to_string).collect(),
        _ => Vec::new(),
    }
}

fn parse_ulid(value: &str) -> anyhow::Result<Ulid> {
    Ulid::from_string(value).map_err(|e| anyhow::anyhow!("invalid ulid {value}: {e}"))
}

fn parse_ulids(values: &[String]) -> anyhow::Result<Vec<Ulid>> {
    values.iter().map(|value| parse_ulid(value)).collect()
}
