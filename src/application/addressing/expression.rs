use thiserror::Error;

use super::context::EvaluationContext;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ExpressionEvaluationError(pub String);

/// Evaluates a boolean selection rule against the evaluation context.
/// Implementations must be side-effect-free; the configuration evaluator
/// relies on identical inputs producing identical outcomes.
pub trait SelectionExpressionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        expression: &str,
        context: &EvaluationContext,
    ) -> Result<bool, ExpressionEvaluationError>;
}
