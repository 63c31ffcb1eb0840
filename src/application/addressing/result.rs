use std::sync::Arc;

use ulid::Ulid;

use super::errors::AddressingError;
use crate::application::services::transports::Transport;
use crate::domain::models::{Recipient, RecipientTransportConfiguration};

/// One configuration that matched, together with the transport it selects and
/// the concrete recipient it matched for (a group member, not the group).
#[derive(Clone)]
pub struct SelectedTransport {
    pub recipient: Recipient,
    pub configuration: RecipientTransportConfiguration,
    pub transport: Arc<dyn Transport>,
}

/// Outcome of evaluating one recipient's configuration list.
#[derive(Clone, Default)]
pub struct ConfigurationEvaluation {
    pub selected: Vec<SelectedTransport>,
    pub errors: Vec<AddressingError>,
}

impl ConfigurationEvaluation {
    pub fn has_selected(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True when any selected configuration forbids descending into group
    /// members.
    pub fn stops_hierarchy_expansion(&self) -> bool {
        self.selected
            .iter()
            .any(|s| s.configuration.continue_in_hierarchy == Some(false))
    }
}

/// Full addressing outcome for one addressed recipient, member results
/// included.
#[derive(Clone)]
pub struct AddressingResult {
    pub recipient: Recipient,
    pub selected: Vec<SelectedTransport>,
    pub errors: Vec<AddressingError>,
}

impl AddressingResult {
    pub fn has_selected_transports(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Roles either delegate to an individual (re-dispatched by the caller,
/// exactly one hop) or are addressed like anyone else. An explicit sum type
/// so delegation chains cannot be built by accident.
#[derive(Clone)]
pub enum RoleEvaluation {
    Delegated { individual: Ulid },
    Addressed(AddressingResult),
}
