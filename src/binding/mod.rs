pub mod context;

pub use context::{BindingContext, ErrorLog, ErrorReporter, TracingErrorReporter};

use crate::command::{execute, CmdStatus, Command, DynCmd, Execution, RegistrationPolicy};
use crate::error::FsmError;
use crate::fsm::{FsmHandler, FsmSignal};
use crate::interaction::{Interaction, InteractionData};
use crate::logging::LogLevel;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

pub type CmdFactory<C, D> = Box<dyn Fn(&D) -> anyhow::Result<C>>;
pub type WhenFn<D> = Box<dyn Fn(&D) -> bool>;
pub type CmdHook<C, D> = Box<dyn Fn(&mut C, &D)>;
pub type DataHook<D> = Box<dyn Fn(&D)>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    #[serde(default)]
    pub name: String,
    /// Execute the command on every update, not only when the gesture ends.
    #[serde(default)]
    pub continuous_execution: bool,
    /// Cancel the whole gesture when `when` is false at start.
    #[serde(default)]
    pub strict_start: bool,
    #[serde(default)]
    pub log_levels: Vec<LogLevel>,
}

/// Customisation points of a binding. Every hook is optional.
pub struct BindingHooks<C, D> {
    pub when: Option<WhenFn<D>>,
    pub first: Option<CmdHook<C, D>>,
    pub then: Option<CmdHook<C, D>>,
    pub end: Option<CmdHook<C, D>>,
    pub cancel: Option<DataHook<D>>,
    pub end_or_cancel: Option<DataHook<D>>,
    pub had_effects: Option<CmdHook<C, D>>,
    pub had_no_effect: Option<CmdHook<C, D>>,
    pub cannot_execute: Option<CmdHook<C, D>>,
}

impl<C, D> Default for BindingHooks<C, D> {
    fn default() -> Self {
        Self {
            when: None,
            first: None,
            then: None,
            end: None,
            cancel: None,
            end_or_cancel: None,
            had_effects: None,
            had_no_effect: None,
            cannot_execute: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Update,
    Stop,
}

struct BindingState<C, D> {
    me: Weak<RefCell<BindingState<C, D>>>,
    interaction: Interaction<D>,
    ctx: BindingContext,
    config: BindingConfig,
    factory: CmdFactory<C, D>,
    hooks: BindingHooks<C, D>,
    cmd: Option<Rc<RefCell<C>>>,
    /// Asynchronous commands submitted at stop and not resolved yet.
    pending: Vec<Rc<RefCell<C>>>,
    /// One entry per continuous run still in flight.
    updating: Vec<Rc<RefCell<C>>>,
    /// Cancelled commands whose late runs applied an effect, undone once
    /// their last run resolves.
    late_effects: Vec<Rc<RefCell<C>>>,
    activated: bool,
    installed: bool,
    times_ended: usize,
    times_cancelled: usize,
    produced: Vec<UnboundedSender<Rc<RefCell<C>>>>,
    started_at: Option<Duration>,
}

fn run_cmd_hook<C, D>(hook: &Option<CmdHook<C, D>>, cmd: &Rc<RefCell<C>>, data: &D) {
    if let Some(hook) = hook {
        hook(&mut cmd.borrow_mut(), data);
    }
}

fn run_data_hook<D>(hook: &Option<DataHook<D>>, data: &D) {
    if let Some(hook) = hook {
        hook(data);
    }
}

impl<C: Command, D: InteractionData + 'static> BindingState<C, D> {
    fn logs(&self, level: LogLevel) -> bool {
        LogLevel::enabled(&self.config.log_levels, level)
    }

    fn when(&self, data: &D) -> bool {
        self.hooks.when.as_ref().map_or(true, |when| when(data))
    }

    fn create_command(&self, data: &D) -> Option<Rc<RefCell<C>>> {
        match (self.factory)(data) {
            Ok(cmd) => Some(Rc::new(RefCell::new(cmd))),
            Err(err) => {
                self.ctx
                    .errors
                    .report(err.context(format!("binding `{}`: command creation failed", self.config.name)));
                None
            }
        }
    }

    /// Makes sure a command is held when `when` holds. False otherwise.
    fn create_and_init(&mut self, data: &D) -> bool {
        let ok = self.when(data);
        if self.logs(LogLevel::Binding) {
            tracing::info!(binding = %self.config.name, ok, "when predicate");
        }
        if !ok {
            return false;
        }
        if self.cmd.is_none() {
            if self.logs(LogLevel::Command) {
                tracing::info!(binding = %self.config.name, "command creation");
            }
            self.cmd = self.create_command(data);
            match &self.cmd {
                Some(cmd) => run_cmd_hook(&self.hooks.first, cmd, data),
                None => return false,
            }
        }
        true
    }

    fn fsm_starts(&mut self, data: &D) -> Result<(), FsmError> {
        if !self.activated {
            return Ok(());
        }
        self.started_at = Some(self.ctx.scheduler.now());
        let ok = self.when(data);
        if self.logs(LogLevel::Binding) {
            tracing::info!(binding = %self.config.name, ok, "starting binding");
        }
        if ok {
            self.cmd = self.create_command(data);
            if let Some(cmd) = &self.cmd {
                run_cmd_hook(&self.hooks.first, cmd, data);
                if self.logs(LogLevel::Command) {
                    tracing::info!(binding = %self.config.name, command = %cmd.borrow().name(), "command created");
                }
            }
            Ok(())
        } else if self.config.strict_start {
            if self.logs(LogLevel::Binding) {
                tracing::info!(binding = %self.config.name, "cancelling starting interaction");
            }
            Err(FsmError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn fsm_updates(&mut self, data: &D) -> Result<(), FsmError> {
        if !self.activated {
            return Ok(());
        }
        if self.logs(LogLevel::Binding) {
            tracing::info!(binding = %self.config.name, "binding updates");
        }
        if !self.create_and_init(data) {
            return Ok(());
        }
        let Some(cmd) = self.cmd.clone() else {
            return Ok(());
        };
        run_cmd_hook(&self.hooks.then, &cmd, data);
        if self.config.continuous_execution {
            match execute(&cmd) {
                Execution::Ready(true) => {}
                Execution::Ready(false) => run_cmd_hook(&self.hooks.cannot_execute, &cmd, data),
                Execution::Pending(future) => self.spawn_completion(cmd, future, Stage::Update),
            }
        }
        Ok(())
    }

    fn fsm_stops(&mut self, data: &D) -> Result<(), FsmError> {
        if !self.activated {
            return Ok(());
        }
        if self.logs(LogLevel::Binding) {
            tracing::info!(binding = %self.config.name, "binding stops");
        }
        if self.create_and_init(data) {
            let Some(cmd) = self.cmd.take() else {
                return Ok(());
            };
            if !self.config.continuous_execution {
                run_cmd_hook(&self.hooks.then, &cmd, data);
            }
            match execute(&cmd) {
                Execution::Ready(ok) => {
                    self.after_executed(&cmd, ok, data);
                    self.times_ended += 1;
                }
                Execution::Pending(future) => {
                    self.pending.push(Rc::clone(&cmd));
                    self.spawn_completion(cmd, future, Stage::Stop);
                }
            }
        } else if let Some(cmd) = self.cmd.take() {
            if self.logs(LogLevel::Command) {
                tracing::info!(binding = %self.config.name, "cancelling the command");
            }
            cmd.borrow_mut().cancel();
            self.times_cancelled += 1;
        }
        self.log_usage("stopped");
        Ok(())
    }

    fn fsm_cancels(&mut self, data: &D) -> Result<(), FsmError> {
        if !self.activated {
            return Ok(());
        }
        self.times_cancelled += 1;
        self.log_usage("cancelled");
        let Some(cmd) = self.cmd.take() else {
            return Ok(());
        };
        if self.logs(LogLevel::Binding) {
            tracing::info!(binding = %self.config.name, "binding cancelled");
        }
        let had_effect = cmd.borrow().had_effect();
        cmd.borrow_mut().cancel();
        if self.config.continuous_execution && had_effect {
            let mut guard = cmd.borrow_mut();
            let name = guard.name();
            match guard.as_undoable() {
                Some(undoable) => {
                    undoable.undo();
                    if self.logs(LogLevel::Command) {
                        tracing::info!(binding = %self.config.name, command = %name, "command undone");
                    }
                }
                None => return Err(FsmError::MustBeUndoable { command: name }),
            }
        }
        run_data_hook(&self.hooks.cancel, data);
        run_data_hook(&self.hooks.end_or_cancel, data);
        Ok(())
    }

    fn after_executed(&mut self, cmd: &Rc<RefCell<C>>, ok: bool, data: &D) {
        if self.logs(LogLevel::Command) {
            tracing::info!(binding = %self.config.name, ok, "command execution result");
        }
        if ok {
            run_cmd_hook(&self.hooks.end, cmd, data);
            run_data_hook(&self.hooks.end_or_cancel, data);
        } else {
            run_cmd_hook(&self.hooks.cannot_execute, cmd, data);
        }

        // A continuous command may have run during updates even if this run failed.
        if cmd.borrow().status() != CmdStatus::Executed {
            return;
        }
        cmd.borrow_mut().done();
        self.produced
            .retain(|tx| tx.unbounded_send(Rc::clone(cmd)).is_ok());

        let had_effect = cmd.borrow().had_effect();
        if self.logs(LogLevel::Command) {
            tracing::info!(binding = %self.config.name, had_effect, "command done");
        }
        if had_effect {
            let shared: DynCmd = Rc::clone(cmd) as DynCmd;
            if cmd.borrow().registration_policy() != RegistrationPolicy::None {
                self.ctx.registry.borrow_mut().add_command(Rc::clone(&shared));
                self.ctx.history.borrow_mut().add(shared);
            } else {
                self.ctx.registry.borrow_mut().remove_command(&shared);
            }
            run_cmd_hook(&self.hooks.had_effects, cmd, data);
        } else {
            run_cmd_hook(&self.hooks.had_no_effect, cmd, data);
        }
    }

    fn spawn_completion(
        &mut self,
        cmd: Rc<RefCell<C>>,
        future: LocalBoxFuture<'static, anyhow::Result<()>>,
        stage: Stage,
    ) {
        if stage == Stage::Update {
            self.updating.push(Rc::clone(&cmd));
        }
        let me = self.me.clone();
        self.ctx.scheduler.spawn(async move {
            let result = future.await;
            let Some(state) = me.upgrade() else {
                return;
            };
            let Ok(mut state) = state.try_borrow_mut() else {
                tracing::warn!("binding busy when an asynchronous command completed");
                return;
            };
            state.complete(cmd, result, stage);
        });
    }

    /// Bookkeeping of an asynchronous execution, in completion order.
    fn complete(&mut self, cmd: Rc<RefCell<C>>, result: anyhow::Result<()>, stage: Stage) {
        let ok = match result {
            Ok(()) => true,
            Err(err) => {
                let name = cmd.borrow().name();
                self.ctx
                    .errors
                    .report(err.context(format!("command `{name}` failed")));
                false
            }
        };
        let interaction = self.interaction.clone();
        let done = match stage {
            Stage::Update => {
                let Some(pos) = self.updating.iter().position(|u| Rc::ptr_eq(u, &cmd)) else {
                    tracing::debug!(binding = %self.config.name, "completed update run was disowned");
                    return;
                };
                self.updating.remove(pos);
                let held = self.cmd.as_ref().is_some_and(|held| Rc::ptr_eq(held, &cmd));
                if !held {
                    if cmd.borrow().status() == CmdStatus::Cancelled {
                        self.settle_late_run(cmd, ok);
                    }
                    return;
                }
                if ok {
                    return;
                }
                interaction.try_with_data(|data| {
                    run_cmd_hook(&self.hooks.cannot_execute, &cmd, data);
                })
            }
            Stage::Stop => {
                let Some(pos) = self.pending.iter().position(|p| Rc::ptr_eq(p, &cmd)) else {
                    tracing::debug!(binding = %self.config.name, "completed command was disowned");
                    return;
                };
                self.pending.remove(pos);
                self.times_ended += 1;
                interaction.try_with_data(|data| self.after_executed(&cmd, ok, data))
            }
        };
        if done.is_none() {
            tracing::warn!(binding = %self.config.name, "interaction busy, command completion skipped");
        }
    }

    /// A continuous run that resolved after its command was cancelled. Once
    /// the last run is in, an effect that landed is undone, or reported when
    /// the command cannot be undone: there is no caller left to fail.
    fn settle_late_run(&mut self, cmd: Rc<RefCell<C>>, ok: bool) {
        let late = self.late_effects.iter().position(|c| Rc::ptr_eq(c, &cmd));
        if ok && late.is_none() {
            self.late_effects.push(Rc::clone(&cmd));
        }
        if self.updating.iter().any(|u| Rc::ptr_eq(u, &cmd)) {
            return;
        }
        let Some(pos) = self.late_effects.iter().position(|c| Rc::ptr_eq(c, &cmd)) else {
            return;
        };
        self.late_effects.remove(pos);
        let mut guard = cmd.borrow_mut();
        let name = guard.name();
        match guard.as_undoable() {
            Some(undoable) => {
                undoable.undo();
                if self.logs(LogLevel::Command) {
                    tracing::info!(binding = %self.config.name, command = %name, "late effect undone");
                }
            }
            None => self.ctx.errors.report(
                anyhow::Error::new(FsmError::MustBeUndoable { command: name })
                    .context(format!("binding `{}`: cancelled command resolved late", self.config.name)),
            ),
        }
    }

    fn log_usage(&mut self, outcome: &str) {
        let Some(started) = self.started_at.take() else {
            return;
        };
        if self.logs(LogLevel::Usage) {
            let elapsed = self.ctx.scheduler.now().saturating_sub(started);
            tracing::info!(
                binding = %self.config.name,
                outcome,
                duration_ms = elapsed.as_millis() as u64,
                "gesture usage"
            );
        }
    }

    fn disown_commands(&mut self) {
        if let Some(cmd) = self.cmd.take() {
            cmd.borrow_mut().flush();
        }
        for cmd in self.pending.drain(..) {
            cmd.borrow_mut().flush();
        }
        self.updating.clear();
        self.late_effects.clear();
    }
}

struct BindingHandler<C, D> {
    state: Weak<RefCell<BindingState<C, D>>>,
}

impl<C: Command, D: InteractionData + 'static> FsmHandler<D> for BindingHandler<C, D> {
    fn on_signal(&self, signal: FsmSignal, data: &D) -> Result<(), FsmError> {
        let Some(state) = self.state.upgrade() else {
            return Ok(());
        };
        let Ok(mut state) = state.try_borrow_mut() else {
            tracing::warn!(?signal, "binding busy, lifecycle signal dropped");
            return Ok(());
        };
        match signal {
            FsmSignal::Starts => state.fsm_starts(data),
            FsmSignal::Updates => state.fsm_updates(data),
            FsmSignal::Stops => state.fsm_stops(data),
            FsmSignal::Cancels => state.fsm_cancels(data),
        }
    }
}

/// Turns the lifecycle of one interaction into commands.
pub struct Binding<C, D> {
    state: Rc<RefCell<BindingState<C, D>>>,
    interaction: Interaction<D>,
    handler: Rc<dyn FsmHandler<D>>,
}

impl<C, D> Clone for Binding<C, D> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            interaction: self.interaction.clone(),
            handler: Rc::clone(&self.handler),
        }
    }
}

impl<C: Command, D: InteractionData + 'static> Binding<C, D> {
    pub fn new(
        ctx: BindingContext,
        interaction: Interaction<D>,
        factory: CmdFactory<C, D>,
        hooks: BindingHooks<C, D>,
        config: BindingConfig,
    ) -> Self {
        if config.log_levels.contains(&LogLevel::Interaction) {
            interaction.set_log(true);
        }
        let state = Rc::new_cyclic(|me| {
            RefCell::new(BindingState {
                me: me.clone(),
                interaction: interaction.clone(),
                ctx,
                config,
                factory,
                hooks,
                cmd: None,
                pending: Vec::new(),
                updating: Vec::new(),
                late_effects: Vec::new(),
                activated: true,
                installed: true,
                times_ended: 0,
                times_cancelled: 0,
                produced: Vec::new(),
                started_at: None,
            })
        });
        let handler: Rc<dyn FsmHandler<D>> = Rc::new(BindingHandler {
            state: Rc::downgrade(&state),
        });
        interaction.add_handler(Rc::clone(&handler));
        Self {
            state,
            interaction,
            handler,
        }
    }

    pub fn name(&self) -> String {
        self.state.borrow().config.name.clone()
    }

    pub fn interaction(&self) -> &Interaction<D> {
        &self.interaction
    }

    /// The command of the running gesture, if any.
    pub fn command(&self) -> Option<Rc<RefCell<C>>> {
        self.state.borrow().cmd.clone()
    }

    pub fn pending_commands(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn is_activated(&self) -> bool {
        self.state.borrow().activated
    }

    /// Deactivating resets the interaction and flushes held and pending
    /// commands: none of them will be executed or registered afterwards.
    pub fn activate(&self, activated: bool) {
        {
            let mut state = self.state.borrow_mut();
            if !state.installed {
                return;
            }
            state.activated = activated;
            if !activated {
                state.disown_commands();
            }
        }
        self.interaction.set_activated(activated);
    }

    pub fn is_running(&self) -> bool {
        self.interaction.is_running()
    }

    pub fn is_continuous(&self) -> bool {
        self.state.borrow().config.continuous_execution
    }

    pub fn is_strict_start(&self) -> bool {
        self.state.borrow().config.strict_start
    }

    pub fn times_ended(&self) -> usize {
        self.state.borrow().times_ended
    }

    pub fn times_cancelled(&self) -> usize {
        self.state.borrow().times_cancelled
    }

    /// Stream of the commands this binding completes. Ends on
    /// [`Binding::uninstall`].
    pub fn produces(&self) -> UnboundedReceiver<Rc<RefCell<C>>> {
        let (tx, rx) = mpsc::unbounded();
        self.state.borrow_mut().produced.push(tx);
        rx
    }

    pub fn clear_events(&self) {
        self.interaction.full_reinit();
    }

    pub fn is_installed(&self) -> bool {
        self.state.borrow().installed
    }

    /// Permanently detaches the binding from its interaction.
    pub fn uninstall(&self) {
        self.activate(false);
        self.interaction.remove_handler(&self.handler);
        self.interaction.uninstall();
        let mut state = self.state.borrow_mut();
        state.installed = false;
        state.produced.clear();
    }
}
