use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use ulid::Ulid;

use crate::domain::errors::ResolutionError;
use crate::domain::models::{Person, Recipient};
use crate::domain::repositories::RecipientRepository;

#[derive(Debug, Error)]
pub enum ResolveFailure {
    /// Terminal for the branch being resolved; reported as an addressing
    /// error, never a crash.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    /// Repository trouble; aborts the whole run.
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

/// Flattens a recipient to the ordered list of Persons it stands for.
pub struct RecipientResolver {
    recipients: Arc<dyn RecipientRepository>,
}

enum Frame {
    Enter(Recipient),
    Leave(Ulid),
}

impl RecipientResolver {
    pub fn new(recipients: Arc<dyn RecipientRepository>) -> Self {
        Self { recipients }
    }

    /// Depth-first, insertion-ordered flattening. A Person resolves to
    /// itself; a Role to its delegated individual or nothing; a Group to its
    /// members in order, duplicates preserved when a Person is reachable via
    /// several paths. Yielding zero Persons is an error, as is a membership
    /// cycle — detected against the set of group ids on the current path, so
    /// diamond-shaped membership stays legal.
    pub async fn resolve(&self, recipient: &Recipient) -> Result<Vec<Person>, ResolveFailure> {
        let mut persons: Vec<Person> = Vec::new();
        let mut path: HashSet<Ulid> = HashSet::new();
        let mut stack = vec![Frame::Enter(recipient.clone())];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Leave(group_id) => {
                    path.remove(&group_id);
                }
                Frame::Enter(Recipient::Person(person)) => persons.push(person),
                Frame::Enter(Recipient::Role(role)) => {
                    let Some(delegate_id) = role.delegate else {
                        continue;
                    };
                    match self.recipients.get(delegate_id).await? {
                        Some(Recipient::Person(person)) => persons.push(person),
                        Some(other) => tracing::warn!(
                            role = %role.id,
                            delegate = %delegate_id,
                            kind = other.kind(),
                            "role delegate is not a person, skipping"
                        ),
                        None => tracing::warn!(
                            role = %role.id,
                            delegate = %delegate_id,
                            "role delegate not found, skipping"
                        ),
                    }
                }
                Frame::Enter(Recipient::Group(group)) => {
                    if path.contains(&group.id) {
                        return Err(
                            ResolutionError::CyclicRecipientGraph(group.id.to_string()).into()
                        );
                    }
                    path.insert(group.id);
                    stack.push(Frame::Leave(group.id));

                    // Reversed so members pop in insertion order.
                    for member_id in group.member_ids.iter().rev() {
                        match self.recipients.get(*member_id).await? {
                            Some(member) => stack.push(Frame::Enter(member)),
                            None => tracing::warn!(
                                group = %group.id,
                                member = %member_id,
                                "group member not found, skipping"
                            ),
                        }
                    }
                }
            }
        }

        if persons.is_empty() {
            return Err(ResolutionError::CannotResolve(recipient.id().to_string()).into());
        }
        Ok(persons)
    }
}
