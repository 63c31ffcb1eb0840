use std::fmt;

use ulid::Ulid;

use crate::domain::errors::ResolutionError;
use crate::domain::models::{Recipient, RecipientTransportConfiguration};

/// Things that can go wrong while addressing one recipient. These are result
/// values, not exceptions: one broken recipient or configuration never aborts
/// the rest of the fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingErrorKind {
    RecipientNotFound,
    CyclicRecipientGraph,
    CannotResolve,
    NoTransportConfigurations,
    NoMatchingConfigurations,
    TransportNotFound,
    EmptyGroup,
    ExpressionEvaluationFailed,
}

impl AddressingErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressingErrorKind::RecipientNotFound => "recipient not found",
            AddressingErrorKind::CyclicRecipientGraph => "cyclic recipient graph",
            AddressingErrorKind::CannotResolve => "cannot resolve recipients",
            AddressingErrorKind::NoTransportConfigurations => "no transport configurations",
            AddressingErrorKind::NoMatchingConfigurations => "no matching configurations",
            AddressingErrorKind::TransportNotFound => "transport not found",
            AddressingErrorKind::EmptyGroup => "empty group without configurations",
            AddressingErrorKind::ExpressionEvaluationFailed => "expression evaluation failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddressingError {
    pub kind: AddressingErrorKind,
    pub recipient_id: Ulid,
    pub recipient_name: Option<String>,
    pub configuration_key: Option<String>,
    pub details: Option<String>,
}

impl AddressingError {
    fn for_recipient(kind: AddressingErrorKind, recipient: &Recipient) -> Self {
        Self {
            kind,
            recipient_id: recipient.id(),
            recipient_name: Some(recipient.name().to_owned()),
            configuration_key: None,
            details: None,
        }
    }

    pub fn recipient_not_found(recipient_id: Ulid) -> Self {
        Self {
            kind: AddressingErrorKind::RecipientNotFound,
            recipient_id,
            recipient_name: None,
            configuration_key: None,
            details: None,
        }
    }

    pub fn no_transport_configurations(recipient: &Recipient) -> Self {
        Self::for_recipient(AddressingErrorKind::NoTransportConfigurations, recipient)
    }

    pub fn no_matching_configurations(recipient: &Recipient) -> Self {
        Self::for_recipient(AddressingErrorKind::NoMatchingConfigurations, recipient)
    }

    pub fn empty_group(recipient: &Recipient) -> Self {
        Self::for_recipient(AddressingErrorKind::EmptyGroup, recipient)
    }

    pub fn transport_not_found(
        recipient: &Recipient,
        configuration: &RecipientTransportConfiguration,
    ) -> Self {
        let mut error = Self::for_recipient(AddressingErrorKind::TransportNotFound, recipient);
        error.configuration_key = Some(configuration.key.clone());
        error
    }

    pub fn expression_evaluation_failed(
        recipient: &Recipient,
        configuration: &RecipientTransportConfiguration,
        details: impl Into<String>,
    ) -> Self {
        let mut error =
            Self::for_recipient(AddressingErrorKind::ExpressionEvaluationFailed, recipient);
        error.configuration_key = Some(configuration.key.clone());
        error.details = Some(details.into());
        error
    }

    pub fn delegate_unusable(recipient: &Recipient, details: impl Into<String>) -> Self {
        let mut error = Self::for_recipient(AddressingErrorKind::RecipientNotFound, recipient);
        error.details = Some(details.into());
        error
    }

    pub fn from_resolution(recipient: &Recipient, failure: &ResolutionError) -> Self {
        let kind = match failure {
            ResolutionError::CannotResolve(_) => AddressingErrorKind::CannotResolve,
            ResolutionError::CyclicRecipientGraph(_) => AddressingErrorKind::CyclicRecipientGraph,
        };
        let mut error = Self::for_recipient(kind, recipient);
        error.details = Some(failure.to_string());
        error
    }
}

impl fmt::Display for AddressingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for recipient {}", self.kind.as_str(), self.recipient_id)?;
        if let Some(name) = &self.recipient_name {
            write!(f, " ({name})")?;
        }
        if let Some(key) = &self.configuration_key {
            write!(f, " [configuration {key}]")?;
        }
        if let Some(details) = &self.details {
            write!(f, ": {details}")?;
        }
        Ok(())
    }
}
