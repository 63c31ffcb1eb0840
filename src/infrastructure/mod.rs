pub mod clock;
pub mod expression;
pub mod messaging;
pub mod repositories;
pub mod transports;
