use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use crate::{
    application::{handlers::ProcessIncomingMessageHandler, services::event_bus::MessageBus},
    domain::events::ProcessIncomingMessage,
};

/// Single-process stand-in for the JetStream fabric, used when no NATS url is
/// configured and in tests. Jobs ride an unbounded channel and do not survive
/// a restart.
pub struct InProcessBus {
    sender: mpsc::UnboundedSender<ProcessIncomingMessage>,
}

impl InProcessBus {
    pub fn new() -> (Arc<Self>, InProcessWorker) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Arc::new(Self { sender }), InProcessWorker { receiver })
    }
}

#[async_trait::async_trait]
impl MessageBus for InProcessBus {
    async fn publish(&self, event: ProcessIncomingMessage) -> anyhow::Result<()> {
        self.sender
            .send(event)
            .map_err(|_| anyhow::anyhow!("in-process worker is gone"))?;
        Ok(())
    }
}

pub struct InProcessWorker {
    receiver: mpsc::UnboundedReceiver<ProcessIncomingMessage>,
}

impl InProcessWorker {
    pub fn spawn(mut self, handler: Arc<ProcessIncomingMessageHandler>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = self.receiver.recv().await {
                if let Err(err) = handler.handle(event).await {
                    error!("addressing failed: {err:?}");
                }
            }
        })
    }
}
