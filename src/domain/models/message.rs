use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::domain::errors::DomainError;

/// Message priority, ordered MIN < LOW < DEFAULT < HIGH < URGENT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Min,
    Low,
    Default,
    High,
    Urgent,
}

impl Priority {
    /// Stable numeric code, stored in the database and exposed to selection
    /// expressions as `priorityValue`.
    pub fn value(&self) -> i32 {
        match self {
            Priority::Min => 0,
            Priority::Low => 10,
            Priority::Default => 20,
            Priority::High => 30,
            Priority::Urgent => 40,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Priority::Min),
            10 => Some(Priority::Low),
            20 => Some(Priority::Default),
            30 => Some(Priority::High),
            40 => Some(Priority::Urgent),
            _ => None,
        }
    }

    /// Name exposed to selection expressions as `priority`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Min => "MIN",
            Priority::Low => "LOW",
            Priority::Default => "DEFAULT",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "MIN" => Some(Priority::Min),
            "LOW" => Some(Priority::Low),
            "DEFAULT" => Some(Priority::Default),
            "HIGH" => Some(Priority::High),
            "URGENT" => Some(Priority::Urgent),
            _ => None,
        }
    }
}

/// An accepted send request. Immutable once created; all delivery state lives
/// in the outgoing event trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Ulid,
    pub sent_at: DateTime<Utc>,
    pub sent_by: Ulid,
    /// Addressed recipient ids, any variant.
    pub to: Vec<Ulid>,
    pub body: String,
    pub priority: Priority,
}

impl IncomingMessage {
    pub fn new(
        sent_at: DateTime<Utc>,
        sent_by: Ulid,
        to: Vec<Ulid>,
        body: impl Into<String>,
        priority: Priority,
    ) -> Result<Self, DomainError> {
        let body = body.into();
        if to.is_empty() {
            return Err(DomainError::Validation(
                "a message needs at least one recipient".into(),
            ));
        }
        if body.trim().is_empty() {
            return Err(DomainError::Validation(
                "a message needs a non-empty body".into(),
            ));
        }

        Ok(Self {
            id: Ulid::new(),
            sent_at,
            sent_by,
            to,
            body,
            priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_are_ordered() {
        assert!(Priority::Min < Priority::Low);
        assert!(Priority::Low < Priority::Default);
        assert!(Priority::Default < Priority::High);
        assert!(Priority::High < Priority::Urgent);
    }

    #[test]
    fn priority_codes_round_trip() {
        for p in [
            Priority::Min,
            Priority::Low,
            Priority::Default,
            Priority::High,
            Priority::Urgent,
        ] {
            assert_eq!(Priority::from_value(p.value()), Some(p));
        }
        assert_eq!(Priority::from_value(7), None);
    }

    #[test]
    fn messages_require_recipients_and_a_body() {
        let sender = Ulid::new();

        let no_recipients =
            IncomingMessage::new(Utc::now(), sender, vec![], "hello", Priority::Default);
        assert!(no_recipients.is_err());

        let blank_body =
            IncomingMessage::new(Utc::now(), sender, vec![Ulid::new()], "   ", Priority::Default);
        assert!(blank_body.is_err());
    }
}
