pub mod health;
pub mod messages;
pub mod root;
pub mod stats;

pub use health::HealthEndpoints;
pub use messages::MessagesEndpoints;
pub use root::{ApiState, EndpointsTags};
pub use stats::StatsEndpoints;
