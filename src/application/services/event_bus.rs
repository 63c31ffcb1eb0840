use async_trait::async_trait;

use crate::domain::events::ProcessIncomingMessage;

/// Carries addressing jobs from the accepting side to the worker.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, event: ProcessIncomingMessage) -> anyhow::Result<()>;
}
