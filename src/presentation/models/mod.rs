use poem_openapi::Enum;

use crate::domain::models::{OutgoingMessageStatus, Priority};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityDto {
    Min,
    Low,
    Default,
    High,
    Urgent,
}

impl Default for PriorityDto {
    fn default() -> Self {
        PriorityDto::Default
    }
}

impl From<PriorityDto> for Priority {
    fn from(value: PriorityDto) -> Self {
        match value {
            PriorityDto::Min => Priority::Min,
            PriorityDto::Low => Priority::Low,
            PriorityDto::Default => Priority::Default,
            PriorityDto::High => Priority::High,
            PriorityDto::Urgent => Priority::Urgent,
        }
    }
}

impl From<Priority> for PriorityDto {
    fn from(value: Priority) -> Self {
        match value {
            Priority::Min => PriorityDto::Min,
            Priority::Low => PriorityDto::Low,
            Priority::Default => PriorityDto::Default,
            Priority::High => PriorityDto::High,
            Priority::Urgent => PriorityDto::Urgent,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
#[oai(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatusKind {
    NotInitiated,
    Initiated,
    Queued,
    Transmitted,
    Delivered,
    Read,
    Ack,
    Error,
    Timeout,
}

impl From<OutgoingMessageStatus> for DeliveryStatusKind {
    fn from(value: OutgoingMessageStatus) -> Self {
        match value {
            OutgoingMessageStatus::NotInitiated => DeliveryStatusKind::NotInitiated,
            OutgoingMessageStatus::Initiated => DeliveryStatusKind::Initiated,
            OutgoingMessageStatus::Queued => DeliveryStatusKind::Queued,
            OutgoingMessageStatus::Transmitted => DeliveryStatusKind::Transmitted,
            OutgoingMessageStatus::Delivered => DeliveryStatusKind::Delivered,
            OutgoingMessageStatus::Read => DeliveryStatusKind::Read,
            OutgoingMessageStatus::Ack => DeliveryStatusKind::Ack,
            OutgoingMessageStatus::Error => DeliveryStatusKind::Error,
            OutgoingMessageStatus::Timeout => DeliveryStatusKind::Timeout,
        }
    }
}
