#![allow(dead_code)]

use futures::FutureExt;
use gesture_binder::command::{CmdStatus, Command, Execution, RegistrationPolicy, Undoable};
use gesture_binder::scheduler::Scheduler;
use std::time::Duration;

/// Counts executions; `effects` decides whether a run had effect.
#[derive(Debug)]
pub struct StubCmd {
    pub status: CmdStatus,
    pub exec: usize,
    pub effects: bool,
    pub executable: bool,
    pub flushed: bool,
    pub policy: Option<RegistrationPolicy>,
}

impl StubCmd {
    pub fn new(effects: bool) -> Self {
        Self {
            status: CmdStatus::Created,
            exec: 0,
            effects,
            executable: true,
            flushed: false,
            policy: None,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            policy: Some(RegistrationPolicy::Unlimited),
            ..Self::new(true)
        }
    }
}

impl Command for StubCmd {
    fn status(&self) -> CmdStatus {
        self.status
    }

    fn set_status(&mut self, status: CmdStatus) {
        self.status = status;
    }

    fn execution(&mut self) -> Execution {
        self.exec += 1;
        Execution::Ready(true)
    }

    fn can_execute(&self) -> bool {
        self.executable
    }

    fn had_effect(&self) -> bool {
        self.effects && matches!(self.status, CmdStatus::Executed | CmdStatus::Done)
    }

    fn registration_policy(&self) -> RegistrationPolicy {
        match self.policy {
            Some(policy) if self.had_effect() => policy,
            _ if self.had_effect() => RegistrationPolicy::Limited,
            _ => RegistrationPolicy::None,
        }
    }

    fn flush(&mut self) {
        self.flushed = true;
    }
}

#[derive(Debug)]
pub struct UndoableCmd {
    pub status: CmdStatus,
    pub exec: usize,
    pub undone: usize,
    pub redone: usize,
}

impl UndoableCmd {
    pub fn new() -> Self {
        Self {
            status: CmdStatus::Created,
            exec: 0,
            undone: 0,
            redone: 0,
        }
    }
}

impl Command for UndoableCmd {
    fn status(&self) -> CmdStatus {
        self.status
    }

    fn set_status(&mut self, status: CmdStatus) {
        self.status = status;
    }

    fn execution(&mut self) -> Execution {
        self.exec += 1;
        Execution::Ready(true)
    }

    fn as_undoable(&mut self) -> Option<&mut dyn Undoable> {
        Some(self)
    }
}

impl Undoable for UndoableCmd {
    fn undo(&mut self) {
        self.undone += 1;
    }

    fn redo(&mut self) {
        self.redone += 1;
    }

    fn undo_name(&self) -> String {
        "stub edit".to_string()
    }
}

/// Resolves after `delay` on the scheduler clock.
pub struct AsyncCmd {
    pub status: CmdStatus,
    pub label: String,
    pub delay: Duration,
    pub fail: bool,
    pub flushed: bool,
    pub undoable: bool,
    pub runs: usize,
    pub undone: usize,
    scheduler: Scheduler,
}

impl AsyncCmd {
    pub fn new(scheduler: &Scheduler, delay: Duration) -> Self {
        Self {
            status: CmdStatus::Created,
            label: format!("{}ms", delay.as_millis()),
            delay,
            fail: false,
            flushed: false,
            undoable: false,
            runs: 0,
            undone: 0,
            scheduler: scheduler.clone(),
        }
    }

    pub fn failing(scheduler: &Scheduler, delay: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(scheduler, delay)
        }
    }

    pub fn undoable(scheduler: &Scheduler, delay: Duration) -> Self {
        Self {
            undoable: true,
            ..Self::new(scheduler, delay)
        }
    }
}

impl Command for AsyncCmd {
    fn status(&self) -> CmdStatus {
        self.status
    }

    fn set_status(&mut self, status: CmdStatus) {
        self.status = status;
    }

    fn execution(&mut self) -> Execution {
        self.runs += 1;
        let sleep = self.scheduler.sleep(self.delay);
        let fail = self.fail;
        let label = self.label.clone();
        Execution::Pending(
            async move {
                sleep.await;
                if fail {
                    anyhow::bail!("{label} rejected");
                }
                Ok(())
            }
            .boxed_local(),
        )
    }

    fn flush(&mut self) {
        self.flushed = true;
    }

    fn name(&self) -> String {
        self.label.clone()
    }

    fn as_undoable(&mut self) -> Option<&mut dyn Undoable> {
        if self.undoable {
            Some(self)
        } else {
            None
        }
    }
}

impl Undoable for AsyncCmd {
    fn undo(&mut self) {
        self.undone += 1;
    }

    fn redo(&mut self) {}
}
