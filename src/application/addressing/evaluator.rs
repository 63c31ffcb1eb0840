use std::collections::HashMap;
use std::sync::Arc;

use super::context::EvaluationContext;
use super::errors::AddressingError;
use super::expression::SelectionExpressionEvaluator;
use super::result::{ConfigurationEvaluation, SelectedTransport};
use crate::application::services::transports::Transport;
use crate::domain::models::{IncomingMessage, Recipient};

/// Walks one recipient's configurations in rank order and decides which
/// transports apply. Pure over its inputs: same recipient, registry, context
/// and message always produce the same outcome.
pub struct TransportConfigurationEvaluator {
    expressions: Arc<dyn SelectionExpressionEvaluator>,
}

impl TransportConfigurationEvaluator {
    pub fn new(expressions: Arc<dyn SelectionExpressionEvaluator>) -> Self {
        Self { expressions }
    }

    pub fn evaluate(
        &self,
        recipient: &Recipient,
        transports: &HashMap<String, Arc<dyn Transport>>,
        context: &EvaluationContext,
        message: &IncomingMessage,
    ) -> ConfigurationEvaluation {
        let configurations = recipient.configurations_by_rank();
        if configurations.is_empty() {
            return ConfigurationEvaluation {
                selected: Vec::new(),
                errors: vec![AddressingError::no_transport_configurations(recipient)],
            };
        }

        let mut selected: Vec<SelectedTransport> = Vec::new();
        let mut errors: Vec<AddressingError> = Vec::new();

        for configuration in configurations {
            if !configuration.enabled {
                continue;
            }

            let Some(transport) = transports.get(&configuration.key) else {
                errors.push(AddressingError::transport_not_found(recipient, configuration));
                continue;
            };

            let matches = match &configuration.selection_expression {
                None => true,
                Some(expression) => match self.expressions.evaluate(expression, context) {
                    Ok(value) => value,
                    Err(failure) => {
                        errors.push(AddressingError::expression_evaluation_failed(
                            recipient,
                            configuration,
                            failure.to_string(),
                        ));
                        false
                    }
                },
            };

            if matches && transport.can_send_to(recipient, message) {
                selected.push(SelectedTransport {
                    recipient: recipient.clone(),
                    configuration: configuration.clone(),
                    transport: transport.clone(),
                });
                if !configuration.evaluate_other_configurations {
                    break;
                }
            }
        }

        if selected.is_empty() && errors.is_empty() {
            errors.push(AddressingError::no_matching_configurations(recipient));
        }

        ConfigurationEvaluation { selected, errors }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::application::addressing::errors::AddressingErrorKind;

    fn evaluator() -> (TransportConfigurationEvaluator, Arc<StaticExpressions>) {
        let expressions = Arc::new(StaticExpressions::default());
        (
            TransportConfigurationEvaluator::new(expressions.clone()),
            expressions,
        )
    }

    #[test]
    fn selections_come_out_ranked_highest_first() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![
            RecordingTransport::new("a"),
            RecordingTransport::new("b"),
            RecordingTransport::new("c"),
        ]);
        let recipient = person_with(vec![
            configuration("a", 1),
            configuration("b", 5),
            configuration("c", 3),
        ]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        let keys: Vec<_> = evaluation
            .selected
            .iter()
            .map(|s| s.configuration.key.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
        assert!(!evaluation.has_errors());
    }

    #[test]
    fn no_configurations_yields_the_dedicated_error() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![RecordingTransport::new("a")]);
        let recipient = person_with(vec![]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        assert!(!evaluation.has_selected());
        assert_eq!(evaluation.errors.len(), 1);
        assert_eq!(
            evaluation.errors[0].kind,
            AddressingErrorKind::NoTransportConfigurations
        );
    }

    #[test]
    fn disabled_configurations_are_skipped_silently() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![RecordingTransport::new("a")]);
        let mut disabled = configuration("a", 0);
        disabled.enabled = false;
        let recipient = person_with(vec![disabled]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        assert!(!evaluation.has_selected());
        assert_eq!(evaluation.errors.len(), 1);
        assert_eq!(
            evaluation.errors[0].kind,
            AddressingErrorKind::NoMatchingConfigurations
        );
    }

    #[test]
    fn unknown_transport_keys_are_reported_and_do_not_block_others() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![RecordingTransport::new("known")]);
        let recipient = person_with(vec![
            configuration("ghost", 9),
            configuration("known", 1),
        ]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        assert_eq!(evaluation.selected.len(), 1);
        assert_eq!(evaluation.selected[0].configuration.key, "known");
        assert_eq!(evaluation.errors.len(), 1);
        assert_eq!(
            evaluation.errors[0].kind,
            AddressingErrorKind::TransportNotFound
        );
        assert_eq!(
            evaluation.errors[0].configuration_key.as_deref(),
            Some("ghost")
        );
    }

    #[test]
    fn broken_expressions_are_isolated_per_configuration() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![
            RecordingTransport::new("broken"),
            RecordingTransport::new("good"),
        ]);
        let mut broken = configuration("broken", 9);
        broken.set_selection_expression("priority >=> nonsense").unwrap();
        let recipient = person_with(vec![broken, configuration("good", 1)]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        assert_eq!(evaluation.selected.len(), 1);
        assert_eq!(evaluation.selected[0].configuration.key, "good");
        assert_eq!(evaluation.errors.len(), 1);
        assert_eq!(
            evaluation.errors[0].kind,
            AddressingErrorKind::ExpressionEvaluationFailed
        );
    }

    #[test]
    fn non_matching_expressions_leave_no_error_but_trigger_the_fallback() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![RecordingTransport::new("a")]);
        let mut never = configuration("a", 0);
        never.set_selection_expression("false").unwrap();
        let recipient = person_with(vec![never]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        assert!(!evaluation.has_selected());
        assert_eq!(evaluation.errors.len(), 1);
        assert_eq!(
            evaluation.errors[0].kind,
            AddressingErrorKind::NoMatchingConfigurations
        );
    }

    #[test]
    fn recipient_preconditions_gate_selection() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![RecordingTransport::refusing_recipients("a")]);
        let recipient = person_with(vec![configuration("a", 0)]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        assert!(!evaluation.has_selected());
        assert_eq!(
            evaluation.errors[0].kind,
            AddressingErrorKind::NoMatchingConfigurations
        );
    }

    #[test]
    fn selection_can_stop_further_evaluation() {
        let (evaluator, expressions) = evaluator();
        let registry = registry_of(vec![
            RecordingTransport::new("first"),
            RecordingTransport::new("second"),
        ]);
        let mut exclusive = configuration("first", 9);
        exclusive.evaluate_other_configurations = false;
        let mut second = configuration("second", 1);
        second.set_selection_expression("true").unwrap();
        let recipient = person_with(vec![exclusive, second]);
        let message = message_to(vec![recipient.id()]);

        let evaluation =
            evaluator.evaluate(&recipient, &registry, &context_for(&message), &message);

        assert_eq!(evaluation.selected.len(), 1);
        assert_eq!(evaluation.selected[0].configuration.key, "first");
        // The second configuration's expression was never consulted.
        assert_eq!(
            expressions.calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let (evaluator, _) = evaluator();
        let registry = registry_of(vec![
            RecordingTransport::new("a"),
            RecordingTransport::new("b"),
        ]);
        let mut conditional = configuration("b", 2);
        conditional.set_selection_expression("true").unwrap();
        let recipient = person_with(vec![configuration("a", 1), conditional]);
        let message = message_to(vec![recipient.id()]);
        let context = context_for(&message);

        let first = evaluator.evaluate(&recipient, &registry, &context, &message);
        let second = evaluator.evaluate(&recipient, &registry, &context, &message);

        let keys = |e: &ConfigurationEvaluation| {
            e.selected
                .iter()
                .map(|s| s.configuration.key.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(first.errors.len(), second.errors.len());
    }
}
