use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Recipient graph resolution failures. These are terminal for the branch
/// being resolved, not for the whole addressing run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("cannot resolve recipients: {0} yields no persons")]
    CannotResolve(String),
    #[error("cyclic recipient graph detected at {0}")]
    CyclicRecipientGraph(String),
}
