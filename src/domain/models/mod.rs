pub mod message;
pub mod outgoing;
pub mod recipient;
pub mod transport_configuration;

pub use message::{IncomingMessage, Priority};
pub use outgoing::{
    FAILED_TRANSPORT_SENTINEL, OutgoingMessage, OutgoingMessageEventRecord, OutgoingMessageStatus,
};
pub use recipient::{Group, Person, Recipient, RecipientTransportConfiguration, Role};
pub use transport_configuration::TransportConfiguration;
