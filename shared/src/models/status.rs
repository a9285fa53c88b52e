//! Forward-only status workflows shared by every document type

use thiserror::Error;

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} cannot move from '{from}' to '{to}'")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// A status enum whose allowed transitions are fixed
pub trait StatusFlow: Copy + PartialEq + Sized {
    /// Entity name used in error messages
    const ENTITY: &'static str;

    fn as_str(&self) -> &'static str;

    /// Whether `next` is a legal successor of `self`
    fn can_transition_to(&self, next: Self) -> bool;

    /// Terminal statuses accept no further transitions
    fn is_terminal(&self) -> bool;

    /// Validate a transition, returning the new status
    fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                entity: Self::ENTITY,
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}
