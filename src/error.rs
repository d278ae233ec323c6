use crate::fsm::StateId;
use thiserror::Error;

/// Errors raised while building or running a gesture state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsmError {
    /// The running gesture was abandoned. Raised by strict-start bindings and
    /// state exit checks; the FSM has already reset when a caller sees it.
    #[error("gesture cancelled")]
    Cancelled,
    /// A continuous command had effects but cannot be undone on cancellation.
    #[error("command `{command}` had effects during continuous execution but is not undoable")]
    MustBeUndoable { command: String },
    #[error("state {0} does not belong to this state machine")]
    UnknownState(StateId),
    #[error("transition from `{from}` to `{to}` is not allowed")]
    InvalidTransition { from: String, to: String },
    #[error("state `{0}` already has a timeout transition")]
    DuplicateTimeout(String),
}

impl FsmError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FsmError::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("binder has no command factory")]
    MissingFactory,
}
