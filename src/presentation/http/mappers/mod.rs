use crate::{
    application::usecases::{
        get_message_detail::{MessageDetail, OutgoingDelivery},
        get_message_history::{DeliveryStatus, MessageWithDeliveries},
    },
    domain::models::{IncomingMessage, OutgoingMessageEventRecord},
    presentation::http::responses::{
        DeliveryEventDto, DeliveryStatusDto, MessageDetailDto, MessageSummaryDto,
        OutgoingDeliveryDto,
    },
};

pub fn map_summary(entry: &MessageWithDeliveries) -> MessageSummaryDto {
    MessageSummaryDto {
        id: entry.message.id.to_string(),
        sent_at: entry.message.sent_at.to_rfc3339(),
        sent_by: entry.message.sent_by.to_string(),
        to: map_to(&entry.message),
        body: entry.message.body.clone(),
        priority: entry.message.priority.into(),
        deliveries: entry.deliveries.iter().map(map_delivery).collect(),
    }
}

pub fn map_detail(detail: &MessageDetail) -> MessageDetailDto {
    MessageDetailDto {
        id: detail.message.id.to_string(),
        sent_at: detail.message.sent_at.to_rfc3339(),
        sent_by: detail.message.sent_by.to_string(),
        to: map_to(&detail.message),
        body: detail.message.body.clone(),
        priority: detail.message.priority.into(),
        deliveries: detail.deliveries.iter().map(map_outgoing).collect(),
    }
}

fn map_to(message: &IncomingMessage) -> Vec<String> {
    message.to.iter().map(|id| id.to_string()).collect()
}

fn map_delivery(delivery: &DeliveryStatus) -> DeliveryStatusDto {
    DeliveryStatusDto {
        outgoing_message_id: delivery.outgoing_message_id.to_string(),
        recipient_id: delivery.recipient_id.map(|id| id.to_string()),
        transport_key: delivery.transport_key.clone(),
        status: delivery.status.into(),
        recorded_at: delivery.recorded_at.to_rfc3339(),
    }
}

fn map_outgoing(delivery: &OutgoingDelivery) -> OutgoingDeliveryDto {
    OutgoingDeliveryDto {
        outgoing_message_id: delivery.outgoing_message_id.to_string(),
        recipient_id: delivery.recipient_id.map(|id| id.to_string()),
        transport_key: delivery.transport_key.clone(),
        status: delivery.status.into(),
        events: delivery.events.iter().map(map_event).collect(),
    }
}

fn map_event(record: &OutgoingMessageEventRecord) -> DeliveryEventDto {
    DeliveryEventDto {
        id: record.id.clone(),
        status: record.status.into(),
        recorded_at: record.recorded_at.to_rfc3339(),
    }
}
