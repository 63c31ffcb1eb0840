pub mod context;
pub mod errors;
pub mod evaluator;
pub mod expression;
pub mod recipient_evaluators;
pub mod resolver;
pub mod result;

pub use context::EvaluationContext;
pub use errors::{AddressingError, AddressingErrorKind};
pub use evaluator::TransportConfigurationEvaluator;
pub use expression::{ExpressionEvaluationError, SelectionExpressionEvaluator};
pub use recipient_evaluators::{GroupEvaluator, PersonEvaluator, RoleEvaluator};
pub use resolver::{RecipientResolver, ResolveFailure};
pub use result::{AddressingResult, ConfigurationEvaluation, RoleEvaluation, SelectedTransport};
