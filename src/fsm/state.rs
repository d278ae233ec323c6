use crate::error::FsmError;
use crate::event::{EventKind, InputEvent};
use crate::fsm::transition::{TimeoutTransition, Transition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// Entry point; never a transition target.
    Initial,
    Standard,
    /// Reaching it completes the gesture.
    Terminal,
    /// Reaching it abandons the gesture.
    Cancelling,
}

impl StateKind {
    pub fn can_be_source(self) -> bool {
        matches!(self, StateKind::Initial | StateKind::Standard)
    }

    pub fn can_be_target(self) -> bool {
        !matches!(self, StateKind::Initial)
    }
}

pub(crate) type ExitCheck<D> = Box<dyn Fn(&D) -> Result<(), FsmError>>;

pub struct State<D> {
    name: String,
    kind: StateKind,
    pub(crate) transitions: Vec<Transition<D>>,
    pub(crate) timeout: Option<TimeoutTransition<D>>,
    pub(crate) exit_check: Option<ExitCheck<D>>,
}

impl<D> State<D> {
    pub(crate) fn new(name: impl Into<String>, kind: StateKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transitions: Vec::new(),
            timeout: None,
            exit_check: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn transitions(&self) -> &[Transition<D>] {
        &self.transitions
    }

    pub fn timeout(&self) -> Option<&TimeoutTransition<D>> {
        self.timeout.as_ref()
    }

    pub fn accepted_events(&self) -> HashSet<EventKind> {
        self.transitions
            .iter()
            .flat_map(|tr| tr.accepted_events().iter().copied())
            .collect()
    }

    /// Index of the first transition, in insertion order, that accepts
    /// `event` and whose guard holds.
    pub(crate) fn find_transition(&self, event: &InputEvent, data: &D) -> Option<usize> {
        self.transitions
            .iter()
            .position(|tr| tr.accept(event) && tr.is_guard_ok(event, data))
    }
}
