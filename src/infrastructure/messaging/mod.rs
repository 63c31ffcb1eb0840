pub mod in_process;
pub mod jetstream;

pub use in_process::{InProcessBus, InProcessWorker};
pub use jetstream::{JetstreamBus, JetstreamConfig, JetstreamWorker};
