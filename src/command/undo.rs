use crate::command::DynCmd;

pub const DEFAULT_UNDO_SIZE: usize = 30;

/// Undo and redo stacks of undoable commands.
pub struct UndoHistory {
    undos: Vec<DynCmd>,
    redos: Vec<DynCmd>,
    size_max: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_SIZE)
    }
}

impl std::fmt::Debug for UndoHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoHistory")
            .field("undos", &self.undos.len())
            .field("redos", &self.redos.len())
            .field("size_max", &self.size_max)
            .finish()
    }
}

impl UndoHistory {
    pub fn new(size_max: usize) -> Self {
        Self {
            undos: Vec::new(),
            redos: Vec::new(),
            size_max,
        }
    }

    /// Pushes `cmd` if it is undoable and clears the redo stack. The oldest
    /// entry is dropped when the stack is full.
    pub fn add(&mut self, cmd: DynCmd) -> bool {
        if self.size_max == 0 || cmd.borrow_mut().as_undoable().is_none() {
            return false;
        }
        if self.undos.len() >= self.size_max {
            self.undos.remove(0);
        }
        self.undos.push(cmd);
        self.redos.clear();
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(cmd) = self.undos.pop() else {
            return false;
        };
        if let Some(undoable) = cmd.borrow_mut().as_undoable() {
            undoable.undo();
        }
        self.redos.push(cmd);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(cmd) = self.redos.pop() else {
            return false;
        };
        if let Some(undoable) = cmd.borrow_mut().as_undoable() {
            undoable.redo();
        }
        self.undos.push(cmd);
        true
    }

    pub fn undo_len(&self) -> usize {
        self.undos.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redos.len()
    }

    pub fn last_undo_message(&self) -> Option<String> {
        self.undos.last().map(undo_name)
    }

    pub fn last_redo_message(&self) -> Option<String> {
        self.redos.last().map(undo_name)
    }

    pub fn size_max(&self) -> usize {
        self.size_max
    }

    pub fn set_size_max(&mut self, size_max: usize) {
        self.size_max = size_max;
        if self.undos.len() > size_max {
            let excess = self.undos.len() - size_max;
            self.undos.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.undos.clear();
        self.redos.clear();
    }
}

fn undo_name(cmd: &DynCmd) -> String {
    cmd.borrow_mut()
        .as_undoable()
        .map(|undoable| undoable.undo_name())
        .unwrap_or_default()
}
