use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::models::{IncomingMessage, OutgoingMessage, Recipient, TransportConfiguration};
use crate::domain::repositories::TransportConfigurationRepository;

/// The capability every delivery channel implements. One instance exists per
/// enabled system transport configuration.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Key of the system configuration this instance was built from; the
    /// value recipient configurations reference.
    fn key(&self) -> &str;

    /// True only when the system vendor configuration is populated well
    /// enough to attempt sends at all.
    fn accepts_new_messages(&self) -> bool;

    /// Recipient-level precondition, e.g. a configured topic or cap code.
    fn can_send_to(&self, recipient: &Recipient, message: &IncomingMessage) -> bool;

    /// Attempts delivery and appends exactly one terminal status event:
    /// TRANSMITTED on success, ERROR on any vendor failure — never both,
    /// never neither. QUEUED may precede for deferred transports. Returns
    /// `Err` only when the event trail itself cannot be written.
    async fn send(&self, message: &OutgoingMessage) -> anyhow::Result<()>;
}

pub trait TransportFactory: Send + Sync {
    /// Whether this factory builds the given transport implementation
    /// identifier (the `transport` column of a system configuration).
    fn supports(&self, transport: &str) -> bool;

    fn with_system_configuration(&self, configuration: TransportConfiguration)
    -> Arc<dyn Transport>;
}

/// Builds the active transport registry out of enabled system configurations
/// and the registered factories.
pub struct TransportManager {
    configurations: Arc<dyn TransportConfigurationRepository>,
    factories: Vec<Arc<dyn TransportFactory>>,
}

impl TransportManager {
    pub fn new(
        configurations: Arc<dyn TransportConfigurationRepository>,
        factories: Vec<Arc<dyn TransportFactory>>,
    ) -> Self {
        Self {
            configurations,
            factories,
        }
    }

    /// One transport per enabled system configuration, keyed by configuration
    /// key and filtered to those currently accepting new messages. An enabled
    /// configuration no registered factory supports is a broken deployment
    /// and fails the whole run.
    pub async fn active_transports(&self) -> anyhow::Result<HashMap<String, Arc<dyn Transport>>> {
        let mut active: HashMap<String, Arc<dyn Transport>> = HashMap::new();

        for configuration in self.configurations.list_enabled().await? {
            let factory = self
                .factories
                .iter()
                .find(|f| f.supports(&configuration.transport))
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "no transport factory supports {} (required by configuration {})",
                        configuration.transport,
                        configuration.key
                    )
                })?;

            let transport = factory.with_system_configuration(configuration.clone());
            if transport.accepts_new_messages() {
                active.insert(configuration.key.clone(), transport);
            } else {
                tracing::warn!(
                    key = %configuration.key,
                    transport = %configuration.transport,
                    "enabled transport configuration is not accepting new messages"
                );
            }
        }

        Ok(active)
    }
}
