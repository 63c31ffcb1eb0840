use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, warn};
use ulid::Ulid;

use crate::{
    application::{
        addressing::{
            AddressingError, AddressingResult, EvaluationContext, GroupEvaluator, PersonEvaluator,
            RecipientResolver, RoleEvaluation, RoleEvaluator, SelectionExpressionEvaluator,
            TransportConfigurationEvaluator,
        },
        services::{
            event_trail::EventTrail,
            transports::{Transport, TransportManager},
        },
    },
    domain::{
        events::ProcessIncomingMessage,
        models::{IncomingMessage, OutgoingMessage, OutgoingMessageStatus, Recipient},
        repositories::{Clock, IncomingMessageRepository, RecipientRepository},
    },
};

/// Turns one accepted incoming message into outgoing messages: evaluates every
/// addressed recipient, dispatches the selected transports and writes the
/// delivery trail. Addressing problems become trail entries and log lines;
/// only infrastructure failures surface as `Err`.
pub struct ProcessIncomingMessageHandler {
    incoming_messages: Arc<dyn IncomingMessageRepository>,
    recipients: Arc<dyn RecipientRepository>,
    transport_manager: TransportManager,
    person_evaluator: PersonEvaluator,
    role_evaluator: RoleEvaluator,
    group_evaluator: GroupEvaluator,
    event_trail: EventTrail,
    clock: Arc<dyn Clock>,
    send_timeout: Duration,
}

impl ProcessIncomingMessageHandler {
    pub fn new(
        incoming_messages: Arc<dyn IncomingMessageRepository>,
        recipients: Arc<dyn RecipientRepository>,
        transport_manager: TransportManager,
        expressions: Arc<dyn SelectionExpressionEvaluator>,
        event_trail: EventTrail,
        clock: Arc<dyn Clock>,
        send_timeout: Duration,
    ) -> Self {
        let configurations = Arc::new(TransportConfigurationEvaluator::new(expressions));
        let resolver = Arc::new(RecipientResolver::new(recipients.clone()));
        Self {
            incoming_messages,
            recipients,
            transport_manager,
            person_evaluator: PersonEvaluator::new(configurations.clone()),
            role_evaluator: RoleEvaluator::new(configurations.clone()),
            group_evaluator: GroupEvaluator::new(configurations, resolver),
            event_trail,
            clock,
            send_timeout,
        }
    }

    pub async fn handle(&self, event: ProcessIncomingMessage) -> anyhow::Result<()> {
        let message = self
            .incoming_messages
            .get(event.incoming_message_id)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("incoming message {} not found", event.incoming_message_id)
            })?;

        let context =
            EvaluationContext::new(message.priority, self.clock.now(), message.body.len());
        let transports = self.transport_manager.active_transports().await?;

        // Each recipient id is addressed at most once per message, whether it
        // appears twice in the address list or again as a delegate.
        let mut processed: HashSet<Ulid> = HashSet::new();
        for recipient_id in &message.to {
            if !processed.insert(*recipient_id) {
                continue;
            }

            let Some(recipient) = self.recipients.get(*recipient_id).await? else {
                warn!(recipient = %recipient_id, "addressed recipient does not exist");
                self.event_trail
                    .record_unknown_recipient(&message, *recipient_id)
                    .await?;
                continue;
            };

            let result = match &recipient {
                Recipient::Person(person) => Some(self.person_evaluator.evaluate(
                    person,
                    &transports,
                    &context,
                    &message,
                )),
                Recipient::Role(role) => {
                    match self
                        .role_evaluator
                        .evaluate(role, &transports, &context, &message)
                    {
                        RoleEvaluation::Addressed(result) => Some(result),
                        RoleEvaluation::Delegated { individual } => {
                            self.evaluate_delegate(
                                &recipient,
                                individual,
                                &mut processed,
                                &transports,
                                &context,
                                &message,
                            )
                            .await?
                        }
                    }
                }
                Recipient::Group(group) => Some(
                    self.group_evaluator
                        .evaluate(group, &transports, &context, &message)
                        .await?,
                ),
            };

            if let Some(result) = result {
                self.dispatch(result, &message).await?;
            }
        }

        Ok(())
    }

    async fn evaluate_delegate(
        &self,
        role: &Recipient,
        individual: Ulid,
        processed: &mut HashSet<Ulid>,
        transports: &HashMap<String, Arc<dyn Transport>>,
        context: &EvaluationContext,
        message: &IncomingMessage,
    ) -> anyhow::Result<Option<AddressingResult>> {
        if !processed.insert(individual) {
            debug!(delegate = %individual, "delegate already addressed for this message");
            return Ok(None);
        }

        let result = match self.recipients.get(individual).await? {
            Some(Recipient::Person(person)) => {
                self.person_evaluator
                    .evaluate(&person, transports, context, message)
            }
            Some(other) => AddressingResult {
                recipient: role.clone(),
                selected: Vec::new(),
                errors: vec![AddressingError::delegate_unusable(
                    role,
                    format!("delegate {} is a {}, not a person", individual, other.kind()),
                )],
            },
            None => AddressingResult {
                recipient: role.clone(),
                selected: Vec::new(),
                errors: vec![AddressingError::delegate_unusable(
                    role,
                    format!("delegate {individual} does not exist"),
                )],
            },
        };
        Ok(Some(result))
    }

    async fn dispatch(
        &self,
        result: AddressingResult,
        message: &IncomingMessage,
    ) -> anyhow::Result<()> {
        for addressing_error in &result.errors {
            warn!(message = %message.id, "{addressing_error}");
        }

        if !result.has_selected_transports() {
            // A placeholder keeps the undeliverable recipient visible in the
            // delivery history.
            let failure = OutgoingMessage::failure(result.recipient, message.clone());
            self.event_trail
                .record(&failure, OutgoingMessageStatus::Error)
                .await?;
            return Ok(());
        }

        for selection in result.selected {
            let outgoing = OutgoingMessage::for_transport(
                selection.recipient,
                message.clone(),
                selection.transport.key(),
            );
            self.event_trail
                .record(&outgoing, OutgoingMessageStatus::Initiated)
                .await?;

            match timeout(self.send_timeout, selection.transport.send(&outgoing)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(outgoing = %outgoing.id, "transport send failed: {e:#}");
                    return Err(e);
                }
                Err(_) => {
                    warn!(
                        outgoing = %outgoing.id,
                        transport = selection.transport.key(),
                        timeout_ms = self.send_timeout.as_millis() as u64,
                        "transport send timed out"
                    );
                    self.event_trail
                        .record(&outgoing, OutgoingMessageStatus::Timeout)
                        .await?;
                }
            }
        }

        Ok(())
    }
}
