use poem_openapi::Object;

use crate::presentation::models::{DeliveryStatusKind, PriorityDto};

#[derive(Object)]
pub struct SendMessageResponseDto {
    pub message_id: String,
}

/// Latest recorded state of one (recipient, transport) delivery.
#[derive(Object)]
pub struct DeliveryStatusDto {
    pub outgoing_message_id: String,
    pub recipient_id: Option<String>,
    pub transport_key: Option<String>,
    pub status: DeliveryStatusKind,
    pub recorded_at: String,
}

#[derive(Object)]
pub struct MessageSummaryDto {
    pub id: String,
    pub sent_at: String,
    pub sent_by: String,
    pub to: Vec<String>,
    pub body: String,
    pub priority: PriorityDto,
    pub deliveries: Vec<DeliveryStatusDto>,
}

#[derive(Object)]
pub struct PaginatedMessagesDto {
    pub messages: Vec<MessageSummaryDto>,
    pub has_more: bool,
    pub next_offset: Option<u32>,
}

#[derive(Object)]
pub struct DeliveryEventDto {
    pub id: String,
    pub status: DeliveryStatusKind,
    pub recorded_at: String,
}

/// One delivery with its full event history, oldest first.
#[derive(Object)]
pub struct OutgoingDeliveryDto {
    pub outgoing_message_id: String,
    pub recipient_id: Option<String>,
    pub transport_key: Option<String>,
    pub status: DeliveryStatusKind,
    pub events: Vec<DeliveryEventDto>,
}

#[derive(Object)]
pub struct MessageDetailDto {
    pub id: String,
    pub sent_at: String,
    pub sent_by: String,
    pub to: Vec<String>,
    pub body: String,
    pub priority: PriorityDto,
    pub deliveries: Vec<OutgoingDeliveryDto>,
}

#[derive(Object)]
pub struct ErrorCountDto {
    pub errors: u64,
    pub since: Option<String>,
}
