mod state;
mod transition;

pub use state::{State, StateId, StateKind};
pub use transition::{TimeoutTransition, Transition};

use crate::error::FsmError;
use crate::event::{EventKind, InputEvent};
use crate::interaction::InteractionData;
use crate::scheduler::{Scheduler, TimerId};
use std::collections::HashSet;
use std::rc::Rc;

const INITIAL: StateId = StateId(0);

/// Lifecycle signal emitted to FSM handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsmSignal {
    Starts,
    Updates,
    Stops,
    Cancels,
}

/// Subscriber to the lifecycle of one FSM.
///
/// Returning `Err(FsmError::Cancelled)` from `Starts` or `Updates` aborts the
/// firing transition and cancels the gesture.
pub trait FsmHandler<D> {
    fn on_signal(&self, signal: FsmSignal, data: &D) -> Result<(), FsmError>;
}

impl<D, F> FsmHandler<D> for F
where
    F: Fn(FsmSignal, &D) -> Result<(), FsmError>,
{
    fn on_signal(&self, signal: FsmSignal, data: &D) -> Result<(), FsmError> {
        self(signal, data)
    }
}

struct TimerDriver {
    scheduler: Scheduler,
    fire: Rc<dyn Fn()>,
}

#[derive(Debug, Clone, Copy)]
struct ArmedTimeout {
    state: StateId,
    timer: Option<TimerId>,
}

enum Firing<'a> {
    Event { index: usize, event: &'a InputEvent },
    Timeout,
}

/// Runtime of one gesture: states, current pointer and lifecycle handlers.
///
/// Gesture data is owned by the caller and passed to [`Fsm::process`]; the
/// FSM flushes it whenever it resets.
pub struct Fsm<D> {
    states: Vec<State<D>>,
    current: StateId,
    starting: StateId,
    started: bool,
    handlers: Vec<Rc<dyn FsmHandler<D>>>,
    driver: Option<TimerDriver>,
    armed: Option<ArmedTimeout>,
    log: bool,
}

impl<D: InteractionData> Default for Fsm<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: InteractionData> Fsm<D> {
    pub fn new() -> Self {
        Self {
            states: vec![State::new("init", StateKind::Initial)],
            current: INITIAL,
            starting: INITIAL,
            started: false,
            handlers: Vec::new(),
            driver: None,
            armed: None,
            log: false,
        }
    }

    pub fn initial(&self) -> StateId {
        INITIAL
    }

    pub fn add_std_state(&mut self, name: impl Into<String>) -> StateId {
        self.push_state(State::new(name, StateKind::Standard))
    }

    pub fn add_terminal_state(&mut self, name: impl Into<String>) -> StateId {
        self.push_state(State::new(name, StateKind::Terminal))
    }

    pub fn add_cancelling_state(&mut self, name: impl Into<String>) -> StateId {
        self.push_state(State::new(name, StateKind::Cancelling))
    }

    fn push_state(&mut self, state: State<D>) -> StateId {
        self.states.push(state);
        StateId(self.states.len() - 1)
    }

    /// Appends `transition` to the outgoing transitions of `source`.
    /// Evaluation follows insertion order.
    pub fn add_transition(
        &mut self,
        source: StateId,
        transition: Transition<D>,
    ) -> Result<(), FsmError> {
        self.check_edge(source, transition.target())?;
        self.states[source.0].transitions.push(transition);
        Ok(())
    }

    pub fn add_timeout(
        &mut self,
        source: StateId,
        timeout: TimeoutTransition<D>,
    ) -> Result<(), FsmError> {
        self.check_edge(source, timeout.target())?;
        let state = &mut self.states[source.0];
        if state.kind() != StateKind::Standard {
            return Err(FsmError::InvalidTransition {
                from: state.name().to_string(),
                to: "timeout".to_string(),
            });
        }
        if state.timeout.is_some() {
            return Err(FsmError::DuplicateTimeout(state.name().to_string()));
        }
        state.timeout = Some(timeout);
        Ok(())
    }

    /// Check run when `state` is left. An error aborts the firing transition;
    /// `FsmError::Cancelled` routes the gesture to its cancel path.
    pub fn set_exit_check(
        &mut self,
        state: StateId,
        check: impl Fn(&D) -> Result<(), FsmError> + 'static,
    ) -> Result<(), FsmError> {
        self.state_ref(state)?;
        self.states[state.0].exit_check = Some(Box::new(check));
        Ok(())
    }

    /// The gesture emits `Starts` when this state is entered, or left for the
    /// initial state.
    pub fn set_starting_state(&mut self, state: StateId) -> Result<(), FsmError> {
        self.state_ref(state)?;
        self.starting = state;
        Ok(())
    }

    pub fn starting_state(&self) -> StateId {
        self.starting
    }

    /// Populates the machine once. Returns `Ok(false)` without calling
    /// `populate` when states beyond the initial one already exist.
    pub fn build(
        &mut self,
        populate: impl FnOnce(&mut Self) -> Result<(), FsmError>,
    ) -> Result<bool, FsmError> {
        if self.is_built() {
            return Ok(false);
        }
        populate(self)?;
        Ok(true)
    }

    pub fn is_built(&self) -> bool {
        self.states.len() > 1
    }

    pub fn state(&self, id: StateId) -> Option<&State<D>> {
        self.states.get(id.0)
    }

    pub fn states(&self) -> &[State<D>] {
        &self.states
    }

    pub fn find_state(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|state| state.name() == name)
            .map(StateId)
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn current_state_name(&self) -> &str {
        self.states[self.current.0].name()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn accepted_events(&self) -> HashSet<EventKind> {
        self.states
            .iter()
            .flat_map(|state| state.accepted_events())
            .collect()
    }

    pub fn add_handler(&mut self, handler: Rc<dyn FsmHandler<D>>) {
        self.handlers.push(handler);
    }

    pub fn remove_handler(&mut self, handler: &Rc<dyn FsmHandler<D>>) -> bool {
        let target = Rc::as_ptr(handler).cast::<()>();
        let before = self.handlers.len();
        self.handlers
            .retain(|existing| Rc::as_ptr(existing).cast::<()>() != target);
        before != self.handlers.len()
    }

    pub fn clear_handlers(&mut self) {
        self.handlers.clear();
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Arms timeout transitions on `scheduler`; `fire` must route back to
    /// [`Fsm::on_timeout`] with the gesture data.
    pub fn set_timer_driver(&mut self, scheduler: Scheduler, fire: Rc<dyn Fn()>) {
        self.driver = Some(TimerDriver { scheduler, fire });
    }

    pub fn has_armed_timeout(&self) -> bool {
        self.armed.is_some()
    }

    pub fn set_log(&mut self, log: bool) {
        self.log = log;
    }

    /// Feeds one event to the current state.
    ///
    /// `Ok(false)` when no transition accepts it. `Err(FsmError::Cancelled)`
    /// when a cancellation aborted the firing; the FSM has already emitted
    /// `Cancels` and reset by then.
    pub fn process(&mut self, event: &InputEvent, data: &mut D) -> Result<bool, FsmError> {
        let source = self.current;
        let Some(index) = self.states[source.0].find_transition(event, data) else {
            return Ok(false);
        };
        let target = self.states[source.0].transitions[index].target();
        self.fire(source, target, Firing::Event { index, event }, data)?;
        Ok(true)
    }

    /// Fires the armed timeout transition. Stale or missing timeouts are
    /// discarded with `Ok(false)`.
    pub fn on_timeout(&mut self, data: &mut D) -> Result<bool, FsmError> {
        let Some(armed) = self.armed.take() else {
            return Ok(false);
        };
        if armed.state != self.current {
            return Ok(false);
        }
        let Some(target) = self.states[armed.state.0]
            .timeout
            .as_ref()
            .map(|timeout| timeout.target())
        else {
            return Ok(false);
        };
        self.fire(armed.state, target, Firing::Timeout, data)?;
        Ok(true)
    }

    /// Back to the initial state, not started, data flushed. No signal.
    pub fn reinit(&mut self, data: &mut D) {
        self.stop_current_timeout();
        self.current = INITIAL;
        self.started = false;
        data.flush();
    }

    fn fire(
        &mut self,
        source: StateId,
        target: StateId,
        firing: Firing<'_>,
        data: &mut D,
    ) -> Result<(), FsmError> {
        self.stop_current_timeout();
        if self.log {
            tracing::info!(
                from = self.states[source.0].name(),
                to = self.states[target.0].name(),
                "fsm transition"
            );
        }
        match self.run_firing(source, target, firing, data) {
            Ok(()) => Ok(()),
            Err(FsmError::Cancelled) => {
                self.on_cancelling(data)?;
                Err(FsmError::Cancelled)
            }
            Err(err) => {
                self.reinit(data);
                Err(err)
            }
        }
    }

    fn run_firing(
        &mut self,
        source: StateId,
        target: StateId,
        firing: Firing<'_>,
        data: &mut D,
    ) -> Result<(), FsmError> {
        self.exit_state(source, data)?;
        match firing {
            Firing::Event { index, event } => {
                self.states[source.0].transitions[index].run_action(event, data)
            }
            Firing::Timeout => {
                if let Some(timeout) = &self.states[source.0].timeout {
                    timeout.run_action(data);
                }
            }
        }
        self.enter_state(target, data)
    }

    fn exit_state(&mut self, state: StateId, data: &D) -> Result<(), FsmError> {
        if let Some(check) = &self.states[state.0].exit_check {
            check(data)?;
        }
        if self.states[state.0].kind() == StateKind::Initial {
            self.check_starting_state(state, data)?;
        }
        Ok(())
    }

    fn enter_state(&mut self, state: StateId, data: &mut D) -> Result<(), FsmError> {
        match self.states[state.0].kind() {
            StateKind::Standard => {
                self.check_starting_state(state, data)?;
                self.current = state;
                self.arm_timeout(data);
                if self.started {
                    self.emit(FsmSignal::Updates, data)?;
                }
                Ok(())
            }
            StateKind::Terminal => {
                self.check_starting_state(state, data)?;
                self.on_terminating(data)
            }
            StateKind::Cancelling => self.on_cancelling(data),
            StateKind::Initial => Err(FsmError::InvalidTransition {
                from: self.current_state_name().to_string(),
                to: self.states[state.0].name().to_string(),
            }),
        }
    }

    fn check_starting_state(&mut self, state: StateId, data: &D) -> Result<(), FsmError> {
        if !self.started && self.starting == state {
            self.started = true;
            return self.emit(FsmSignal::Starts, data);
        }
        Ok(())
    }

    fn on_terminating(&mut self, data: &mut D) -> Result<(), FsmError> {
        let result = if self.started {
            self.emit(FsmSignal::Stops, data)
        } else {
            Ok(())
        };
        self.reinit(data);
        result
    }

    fn on_cancelling(&mut self, data: &mut D) -> Result<(), FsmError> {
        let result = if self.started {
            self.emit(FsmSignal::Cancels, data)
        } else {
            Ok(())
        };
        self.reinit(data);
        result
    }

    fn emit(&self, signal: FsmSignal, data: &D) -> Result<(), FsmError> {
        for handler in &self.handlers {
            handler.on_signal(signal, data)?;
        }
        Ok(())
    }

    fn arm_timeout(&mut self, data: &D) {
        let Some(timeout) = self.states[self.current.0].timeout.as_ref() else {
            return;
        };
        let delay = timeout.duration_for(data);
        let timer = self.driver.as_ref().map(|driver| {
            let fire = Rc::clone(&driver.fire);
            driver.scheduler.schedule(delay, move || fire())
        });
        self.armed = Some(ArmedTimeout {
            state: self.current,
            timer,
        });
    }

    fn stop_current_timeout(&mut self) {
        if let Some(armed) = self.armed.take() {
            if let (Some(timer), Some(driver)) = (armed.timer, self.driver.as_ref()) {
                driver.scheduler.cancel(timer);
            }
        }
    }

    fn state_ref(&self, id: StateId) -> Result<&State<D>, FsmError> {
        self.states.get(id.0).ok_or(FsmError::UnknownState(id))
    }

    fn check_edge(&self, source: StateId, target: StateId) -> Result<(), FsmError> {
        let src = self.state_ref(source)?;
        let tgt = self.state_ref(target)?;
        if !src.kind().can_be_source() || !tgt.kind().can_be_target() {
            return Err(FsmError::InvalidTransition {
                from: src.name().to_string(),
                to: tgt.name().to_string(),
            });
        }
        Ok(())
    }
}
