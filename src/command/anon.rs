use crate::command::{CmdStatus, Command, Execution};

/// A command whose work is a closure.
pub struct AnonCmd {
    exec: Box<dyn FnMut()>,
    status: CmdStatus,
    name: String,
}

impl AnonCmd {
    pub fn new(exec: impl FnMut() + 'static) -> Self {
        Self::named("AnonCmd", exec)
    }

    pub fn named(name: impl Into<String>, exec: impl FnMut() + 'static) -> Self {
        Self {
            exec: Box::new(exec),
            status: CmdStatus::Created,
            name: name.into(),
        }
    }
}

impl std::fmt::Debug for AnonCmd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnonCmd")
            .field("name", &self.name)
            .field("status", &self.status)
            .finish()
    }
}

impl Command for AnonCmd {
    fn status(&self) -> CmdStatus {
        self.status
    }

    fn set_status(&mut self, status: CmdStatus) {
        self.status = status;
    }

    fn execution(&mut self) -> Execution {
        (self.exec)();
        Execution::Ready(true)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
