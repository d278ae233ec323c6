use gesture_binder::command::{CmdStatus, CommandsRegistry, DynCmd, UndoHistory};
use std::cell::RefCell;
use std::rc::Rc;

#[path = "stub_cmd.rs"]
mod stub_cmd;
use stub_cmd::{StubCmd, UndoableCmd};

fn done(mut cmd: StubCmd) -> Rc<RefCell<StubCmd>> {
    cmd.status = CmdStatus::Done;
    Rc::new(RefCell::new(cmd))
}

fn shared(cmd: &Rc<RefCell<StubCmd>>) -> DynCmd {
    Rc::clone(cmd) as DynCmd
}

#[test]
fn full_registry_evicts_and_flushes_the_oldest() {
    let mut registry = CommandsRegistry::new(2);
    let cmds: Vec<_> = (0..3).map(|_| done(StubCmd::new(true))).collect();
    for cmd in &cmds {
        registry.add_command(shared(cmd));
    }

    assert_eq!(registry.len(), 2);
    assert!(cmds[0].borrow().flushed);
    assert!(!registry.contains(&shared(&cmds[0])));
    assert!(registry.contains(&shared(&cmds[2])));
}

#[test]
fn unlimited_commands_survive_eviction() {
    let mut registry = CommandsRegistry::new(2);
    let pinned = done(StubCmd::unlimited());
    let a = done(StubCmd::new(true));
    let b = done(StubCmd::new(true));
    registry.add_command(shared(&pinned));
    registry.add_command(shared(&a));
    registry.add_command(shared(&b));

    assert!(registry.contains(&shared(&pinned)));
    assert!(!registry.contains(&shared(&a)));
    assert!(a.borrow().flushed);
    assert!(!pinned.borrow().flushed);
}

#[test]
fn removing_flushes() {
    let mut registry = CommandsRegistry::new(5);
    let cmd = done(StubCmd::new(true));
    registry.add_command(shared(&cmd));

    assert!(registry.remove_command(&shared(&cmd)));
    assert!(cmd.borrow().flushed);
    assert!(!registry.remove_command(&shared(&cmd)));
}

#[test]
fn shrinking_the_registry_evicts() {
    let mut registry = CommandsRegistry::new(5);
    let cmds: Vec<_> = (0..4).map(|_| done(StubCmd::new(true))).collect();
    for cmd in &cmds {
        registry.add_command(shared(cmd));
    }

    registry.set_size_max(1);

    assert_eq!(registry.size_max(), 1);
    assert_eq!(registry.len(), 1);
    assert!(registry.contains(&shared(&cmds[3])));
    assert_eq!(cmds.iter().filter(|c| c.borrow().flushed).count(), 3);

    registry.clear();
    assert!(registry.is_empty());
    assert!(cmds[3].borrow().flushed);
}

#[test]
fn undo_then_redo() {
    let mut history = UndoHistory::default();
    let cmd = Rc::new(RefCell::new(UndoableCmd::new()));
    assert!(history.add(Rc::clone(&cmd) as DynCmd));

    assert!(history.undo());
    assert_eq!(cmd.borrow().undone, 1);
    assert_eq!(history.last_redo_message().as_deref(), Some("stub edit"));
    assert!(history.last_undo_message().is_none());

    assert!(history.redo());
    assert_eq!(cmd.borrow().redone, 1);
    assert_eq!(history.undo_len(), 1);
    assert_eq!(history.redo_len(), 0);
    assert!(!history.redo());
}

#[test]
fn new_command_clears_redo_stack() {
    let mut history = UndoHistory::default();
    history.add(Rc::new(RefCell::new(UndoableCmd::new())) as DynCmd);
    history.undo();
    assert_eq!(history.redo_len(), 1);

    history.add(Rc::new(RefCell::new(UndoableCmd::new())) as DynCmd);
    assert_eq!(history.redo_len(), 0);
}

#[test]
fn history_ignores_plain_commands_and_respects_capacity() {
    let mut history = UndoHistory::new(2);
    assert!(!history.add(shared(&done(StubCmd::new(true)))));

    for _ in 0..3 {
        history.add(Rc::new(RefCell::new(UndoableCmd::new())) as DynCmd);
    }
    assert_eq!(history.undo_len(), 2);

    history.set_size_max(1);
    assert_eq!(history.undo_len(), 1);
    history.clear();
    assert_eq!(history.undo_len(), 0);
}
