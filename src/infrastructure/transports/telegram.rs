use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    application::services::{
        event_trail::EventTrail,
        transports::{Transport, TransportFactory},
    },
    domain::models::{
        IncomingMessage, OutgoingMessage, OutgoingMessageStatus, Recipient, TransportConfiguration,
    },
};

pub const TELEGRAM_TRANSPORT: &str = "telegram";

/// Delivery through the Telegram Bot API. The system configuration carries
/// the `botToken`; recipients carry the `chatId` the bot may write to.
pub struct TelegramTransport {
    key: String,
    bot_token: Option<String>,
    base_url: String,
    http: Client,
    trail: EventTrail,
}

impl TelegramTransport {
    /// Chat ids arrive as strings or as bare numbers depending on who edited
    /// the vendor blob; both are accepted.
    fn chat_id_of(&self, recipient: &Recipient) -> Option<String> {
        let configuration = recipient.transport_configuration_for(&self.key)?;
        configuration
            .vendor_str("chatId")
            .or_else(|| configuration.vendor_i64("chatId").map(|id| id.to_string()))
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn key(&self) -> &str {
        &self.key
    }

    fn accepts_new_messages(&self) -> bool {
        self.bot_token.is_some()
    }

    fn can_send_to(&self, recipient: &Recipient, _message: &IncomingMessage) -> bool {
        self.chat_id_of(recipient).is_some()
    }

    async fn send(&self, message: &OutgoingMessage) -> anyhow::Result<()> {
        let chat_id = self.chat_id_of(&message.recipient);
        let (Some(token), Some(chat_id)) = (self.bot_token.as_deref(), chat_id) else {
            warn!(outgoing = %message.id, key = %self.key, "telegram token or chat id missing");
            self.trail
                .record(message, OutgoingMessageStatus::Error)
                .await?;
            return Ok(());
        };

        let url = format!("{}/bot{token}/sendMessage", self.base_url);
        let payload = SendMessagePayload {
            chat_id: &chat_id,
            text: &message.message.body,
        };

        let outcome = async {
            let response = self.http.post(&url).json(&payload).send().await?;
            let body: SendMessageResponse = response.json().await?;
            if !body.ok {
                anyhow::bail!(
                    "telegram api returned error: {}",
                    body.description
                        .unwrap_or_else(|| "unknown error".to_string())
                );
            }
            anyhow::Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                self.trail
                    .record(message, OutgoingMessageStatus::Transmitted)
                    .await?;
            }
            Err(e) => {
                warn!(outgoing = %message.id, "telegram send failed: {e}");
                self.trail
                    .record(message, OutgoingMessageStatus::Error)
                    .await?;
            }
        }
        Ok(())
    }
}

pub struct TelegramTransportFactory {
    http: Client,
    trail: EventTrail,
}

impl TelegramTransportFactory {
    pub fn new(trail: EventTrail) -> Arc<dyn TransportFactory> {
        Arc::new(Self {
            http: Client::builder()
                .user_agent("paging-service/telegram")
                .build()
                .expect("failed to build telegram client"),
            trail,
        }) as Arc<dyn TransportFactory>
    }
}

impl TransportFactory for TelegramTransportFactory {
    fn supports(&self, transport: &str) -> bool {
        transport == TELEGRAM_TRANSPORT
    }

    fn with_system_configuration(
        &self,
        configuration: TransportConfiguration,
    ) -> Arc<dyn Transport> {
        Arc::new(TelegramTransport {
            key: configuration.key.clone(),
            bot_token: configuration.vendor_str("botToken"),
            base_url: "https://api.telegram.org".to_string(),
            http: self.http.clone(),
            trail: self.trail.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}
