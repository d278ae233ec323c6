use crate::command::{DynCmd, RegistrationPolicy};
use std::rc::Rc;

pub const DEFAULT_REGISTRY_SIZE: usize = 50;

/// Commands that had effect, oldest first.
pub struct CommandsRegistry {
    commands: Vec<DynCmd>,
    size_max: usize,
}

impl Default for CommandsRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_SIZE)
    }
}

impl std::fmt::Debug for CommandsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandsRegistry")
            .field("len", &self.commands.len())
            .field("size_max", &self.size_max)
            .finish()
    }
}

pub(crate) fn same_cmd(a: &DynCmd, b: &DynCmd) -> bool {
    Rc::as_ptr(a).cast::<()>() == Rc::as_ptr(b).cast::<()>()
}

impl CommandsRegistry {
    pub fn new(size_max: usize) -> Self {
        Self {
            commands: Vec::new(),
            size_max,
        }
    }

    /// Appends `cmd`. When full, the oldest command that is not
    /// `Unlimited` is evicted and flushed first.
    pub fn add_command(&mut self, cmd: DynCmd) {
        if self.size_max == 0 || self.contains(&cmd) {
            return;
        }
        if self.commands.len() >= self.size_max {
            self.evict_oldest();
        }
        self.commands.push(cmd);
    }

    pub fn remove_command(&mut self, cmd: &DynCmd) -> bool {
        let Some(pos) = self.commands.iter().position(|c| same_cmd(c, cmd)) else {
            return false;
        };
        let removed = self.commands.remove(pos);
        removed.borrow_mut().flush();
        true
    }

    pub fn contains(&self, cmd: &DynCmd) -> bool {
        self.commands.iter().any(|c| same_cmd(c, cmd))
    }

    pub fn commands(&self) -> &[DynCmd] {
        &self.commands
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.borrow().name()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn size_max(&self) -> usize {
        self.size_max
    }

    /// Shrinking evicts the oldest removable commands.
    pub fn set_size_max(&mut self, size_max: usize) {
        self.size_max = size_max;
        while self.commands.len() > size_max {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        for cmd in self.commands.drain(..) {
            cmd.borrow_mut().flush();
        }
    }

    fn evict_oldest(&mut self) -> bool {
        let Some(pos) = self
            .commands
            .iter()
            .position(|c| c.borrow().registration_policy() != RegistrationPolicy::Unlimited)
        else {
            return false;
        };
        let evicted = self.commands.remove(pos);
        tracing::debug!(command = %evicted.borrow().name(), "registry full, evicting");
        evicted.borrow_mut().flush();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{execute, AnonCmd};
    use std::cell::RefCell;

    fn executed(name: &str) -> DynCmd {
        let cmd = Rc::new(RefCell::new(AnonCmd::named(name, || {})));
        execute(&cmd);
        cmd
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut registry = CommandsRegistry::new(5);
        let cmd = executed("a");
        registry.add_command(Rc::clone(&cmd));
        registry.add_command(cmd);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn zero_size_keeps_nothing() {
        let mut registry = CommandsRegistry::new(0);
        registry.add_command(executed("a"));
        assert!(registry.is_empty());
    }
}
