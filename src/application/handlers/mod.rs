pub mod process_incoming_message;

pub use process_incoming_message::ProcessIncomingMessageHandler;
