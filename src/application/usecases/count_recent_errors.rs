use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::repositories::OutgoingMessageEventRepository;

/// Counts ERROR and TIMEOUT trail events, optionally from a cutoff onwards.
/// Backs the operational "is delivery healthy" endpoint.
pub struct CountRecentErrorsUseCase {
    events: Arc<dyn OutgoingMessageEventRepository>,
}

impl CountRecentErrorsUseCase {
    pub fn new(events: Arc<dyn OutgoingMessageEventRepository>) -> Self {
        Self { events }
    }

    pub async fn execute(&self, since: Option<DateTime<Utc>>) -> anyhow::Result<u64> {
        self.events.count_errors_since(since).await
    }
}
