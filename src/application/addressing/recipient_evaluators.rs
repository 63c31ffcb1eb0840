use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::context::EvaluationContext;
use super::errors::AddressingError;
use super::evaluator::TransportConfigurationEvaluator;
use super::resolver::{RecipientResolver, ResolveFailure};
use super::result::{AddressingResult, RoleEvaluation};
use crate::application::services::transports::Transport;
use crate::domain::models::{Group, IncomingMessage, Person, Recipient, Role};

pub struct PersonEvaluator {
    configurations: Arc<TransportConfigurationEvaluator>,
}

impl PersonEvaluator {
    pub fn new(configurations: Arc<TransportConfigurationEvaluator>) -> Self {
        Self { configurations }
    }

    pub fn evaluate(
        &self,
        person: &Person,
        transports: &HashMap<String, Arc<dyn Transport>>,
        context: &EvaluationContext,
        message: &IncomingMessage,
    ) -> AddressingResult {
        let recipient = Recipient::Person(person.clone());
        let evaluation = self
            .configurations
            .evaluate(&recipient, transports, context, message);
        AddressingResult {
            recipient,
            selected: evaluation.selected,
            errors: evaluation.errors,
        }
    }
}

pub struct RoleEvaluator {
    configurations: Arc<TransportConfigurationEvaluator>,
}

impl RoleEvaluator {
    pub fn new(configurations: Arc<TransportConfigurationEvaluator>) -> Self {
        Self { configurations }
    }

    /// A delegated role is entirely the delegate's problem: none of the role's
    /// own configurations are looked at. Only an undelegated role is addressed
    /// through its own configuration list.
    pub fn evaluate(
        &self,
        role: &Role,
        transports: &HashMap<String, Arc<dyn Transport>>,
        context: &EvaluationContext,
        message: &IncomingMessage,
    ) -> RoleEvaluation {
        if let Some(individual) = role.delegate {
            debug!(role = %role.id, delegate = %individual, "role delegates to individual");
            return RoleEvaluation::Delegated { individual };
        }

        let recipient = Recipient::Role(role.clone());
        let evaluation = self
            .configurations
            .evaluate(&recipient, transports, context, message);
        RoleEvaluation::Addressed(AddressingResult {
            recipient,
            selected: evaluation.selected,
            errors: evaluation.errors,
        })
    }
}

pub struct GroupEvaluator {
    configurations: Arc<TransportConfigurationEvaluator>,
    resolver: Arc<RecipientResolver>,
}

impl GroupEvaluator {
    pub fn new(
        configurations: Arc<TransportConfigurationEvaluator>,
        resolver: Arc<RecipientResolver>,
    ) -> Self {
        Self {
            configurations,
            resolver,
        }
    }

    /// Group-owned configurations go first. Members are expanded afterwards
    /// unless a selected group configuration pins delivery to the group level
    /// with `continue_in_hierarchy = Some(false)`. Errors from either stage
    /// accumulate on the result.
    pub async fn evaluate(
        &self,
        group: &Group,
        transports: &HashMap<String, Arc<dyn Transport>>,
        context: &EvaluationContext,
        message: &IncomingMessage,
    ) -> anyhow::Result<AddressingResult> {
        let recipient = Recipient::Group(group.clone());
        let mut selected = Vec::new();
        let mut errors: Vec<AddressingError> = Vec::new();

        if !group.has_members() && !recipient.has_transport_configurations() {
            errors.push(AddressingError::empty_group(&recipient));
            return Ok(AddressingResult {
                recipient,
                selected,
                errors,
            });
        }

        let mut expand = group.has_members();
        if recipient.has_transport_configurations() {
            let own = self
                .configurations
                .evaluate(&recipient, transports, context, message);
            expand = expand && (!own.has_selected() || !own.stops_hierarchy_expansion());
            selected.extend(own.selected);
            errors.extend(own.errors);
        }

        if expand {
            match self.resolver.resolve(&recipient).await {
                Ok(persons) => {
                    let mut seen: HashSet<_> = HashSet::new();
                    for person in persons {
                        // Members reachable through several branches are still
                        // addressed once.
                        if !seen.insert(person.id) {
                            continue;
                        }
                        let member = Recipient::Person(person);
                        let evaluation = self
                            .configurations
                            .evaluate(&member, transports, context, message);
                        selected.extend(evaluation.selected);
                        errors.extend(evaluation.errors);
                    }
                }
                Err(ResolveFailure::Resolution(failure)) => {
                    errors.push(AddressingError::from_resolution(&recipient, &failure));
                }
                Err(ResolveFailure::Repository(e)) => return Err(e),
            }
        }

        Ok(AddressingResult {
            recipient,
            selected,
            errors,
        })
    }
}
