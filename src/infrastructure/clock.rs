use chrono::{DateTime, Utc};

use crate::domain::repositories::Clock;

/// Wall clock used everywhere outside tests.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
