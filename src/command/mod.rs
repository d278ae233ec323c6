pub mod anon;
pub mod registry;
pub mod undo;

pub use anon::AnonCmd;
pub use registry::CommandsRegistry;
pub use undo::UndoHistory;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmdStatus {
    Created,
    Executed,
    Done,
    Cancelled,
}

/// How a command that had effect is kept by the [`CommandsRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPolicy {
    None,
    /// Evicted when the registry is full.
    Limited,
    Unlimited,
}

/// Outcome of starting a command.
pub enum Execution {
    Ready(bool),
    /// The command completes later; `Ok(())` counts as a successful run.
    Pending(LocalBoxFuture<'static, anyhow::Result<()>>),
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Execution::Ready(ok) => f.debug_tuple("Ready").field(ok).finish(),
            Execution::Pending(_) => f.write_str("Pending"),
        }
    }
}

pub trait Undoable {
    fn undo(&mut self);
    fn redo(&mut self);
    fn undo_name(&self) -> String {
        String::new()
    }
}

pub trait Command: 'static {
    fn status(&self) -> CmdStatus;
    fn set_status(&mut self, status: CmdStatus);

    /// Does the work. Only called through [`execute`].
    fn execution(&mut self) -> Execution;

    fn can_execute(&self) -> bool {
        true
    }

    fn had_effect(&self) -> bool {
        matches!(self.status(), CmdStatus::Executed | CmdStatus::Done)
    }

    fn registration_policy(&self) -> RegistrationPolicy {
        if self.had_effect() {
            RegistrationPolicy::Limited
        } else {
            RegistrationPolicy::None
        }
    }

    /// Releases what the command holds once nobody will use it again.
    fn flush(&mut self) {}

    fn as_undoable(&mut self) -> Option<&mut dyn Undoable> {
        None
    }

    fn name(&self) -> String {
        std::any::type_name::<Self>()
            .rsplit("::")
            .next()
            .unwrap_or_default()
            .to_string()
    }

    fn done(&mut self) {
        if self.status() == CmdStatus::Executed {
            self.set_status(CmdStatus::Done);
        }
    }

    fn is_done(&self) -> bool {
        self.status() == CmdStatus::Done
    }

    fn cancel(&mut self) {
        if self.status() != CmdStatus::Done {
            self.set_status(CmdStatus::Cancelled);
        }
    }
}

pub type DynCmd = Rc<RefCell<dyn Command>>;

/// Runs `cmd` if its status and `can_execute` allow it.
///
/// A synchronous success marks it `Executed` right away; a pending one once
/// its future resolves with `Ok`, unless it was cancelled meanwhile.
pub fn execute<C: Command + ?Sized + 'static>(cmd: &Rc<RefCell<C>>) -> Execution {
    let outcome = {
        let mut guard = cmd.borrow_mut();
        let runnable = matches!(guard.status(), CmdStatus::Created | CmdStatus::Executed)
            && guard.can_execute();
        if !runnable {
            return Execution::Ready(false);
        }
        guard.execution()
    };
    match outcome {
        Execution::Ready(true) => {
            cmd.borrow_mut().set_status(CmdStatus::Executed);
            Execution::Ready(true)
        }
        Execution::Ready(false) => Execution::Ready(false),
        Execution::Pending(future) => {
            let cmd = Rc::clone(cmd);
            Execution::Pending(
                async move {
                    future.await?;
                    let mut guard = cmd.borrow_mut();
                    // A command cancelled while its run was pending stays cancelled.
                    if matches!(guard.status(), CmdStatus::Created | CmdStatus::Executed) {
                        guard.set_status(CmdStatus::Executed);
                    }
                    Ok(())
                }
                .boxed_local(),
            )
        }
    }
}
