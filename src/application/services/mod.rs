pub mod event_bus;
pub mod event_trail;
pub mod transports;

pub use event_bus::MessageBus;
pub use event_trail::EventTrail;
pub use transports::{Transport, TransportFactory, TransportManager};
