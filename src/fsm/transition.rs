use crate::event::{EventKind, InputEvent};
use crate::fsm::StateId;
use std::collections::HashSet;
use std::time::Duration;

type Predicate = Box<dyn Fn(&InputEvent) -> bool>;
type Guard<D> = Box<dyn Fn(&InputEvent, &D) -> bool>;
type Action<D> = Box<dyn Fn(&InputEvent, &mut D)>;

/// An event-triggered edge of a gesture FSM.
///
/// `accept` filters on the event shape, `is_guard_ok` on the gesture data
/// accumulated so far. The action runs between the source exit and the
/// target entry.
pub struct Transition<D> {
    target: StateId,
    accepted: HashSet<EventKind>,
    predicate: Option<Predicate>,
    guard: Option<Guard<D>>,
    action: Option<Action<D>>,
}

impl<D> Transition<D> {
    pub fn new(target: StateId, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            target,
            accepted: kinds.into_iter().collect(),
            predicate: None,
            guard: None,
            action: None,
        }
    }

    pub fn accepting(mut self, predicate: impl Fn(&InputEvent) -> bool + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn guarded(mut self, guard: impl Fn(&InputEvent, &D) -> bool + 'static) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }

    pub fn with_action(mut self, action: impl Fn(&InputEvent, &mut D) + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn accepted_events(&self) -> &HashSet<EventKind> {
        &self.accepted
    }

    pub fn accept(&self, event: &InputEvent) -> bool {
        self.accepted.contains(&event.kind)
            && self.predicate.as_ref().map_or(true, |predicate| predicate(event))
    }

    pub fn is_guard_ok(&self, event: &InputEvent, data: &D) -> bool {
        self.guard.as_ref().map_or(true, |guard| guard(event, data))
    }

    pub(crate) fn run_action(&self, event: &InputEvent, data: &mut D) {
        if let Some(action) = &self.action {
            action(event, data);
        }
    }
}

/// A time-triggered edge, armed when its source state is entered.
pub struct TimeoutTransition<D> {
    target: StateId,
    duration: Box<dyn Fn(&D) -> Duration>,
    action: Option<Box<dyn Fn(&mut D)>>,
}

impl<D> TimeoutTransition<D> {
    pub fn new(target: StateId, duration: Duration) -> Self {
        Self::computed(target, move |_| duration)
    }

    /// Timeout whose duration depends on the gesture data at arming time.
    pub fn computed(target: StateId, duration: impl Fn(&D) -> Duration + 'static) -> Self {
        Self {
            target,
            duration: Box::new(duration),
            action: None,
        }
    }

    pub fn with_action(mut self, action: impl Fn(&mut D) + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    pub fn target(&self) -> StateId {
        self.target
    }

    pub fn duration_for(&self, data: &D) -> Duration {
        (self.duration)(data)
    }

    pub(crate) fn run_action(&self, data: &mut D) {
        if let Some(action) = &self.action {
            action(data);
        }
    }
}
