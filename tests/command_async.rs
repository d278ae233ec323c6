use gesture_binder::binding::{BindingContext, ErrorLog};
use gesture_binder::command::{CmdStatus, Command};
use gesture_binder::error::FsmError;
use gesture_binder::event::{EventKind, InputEvent};
use gesture_binder::gestures;
use gesture_binder::scheduler::Scheduler;
use gesture_binder::source::{NodeId, NodeTree};
use gesture_binder::{Binder, Binding};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[path = "stub_cmd.rs"]
mod stub_cmd;
use stub_cmd::AsyncCmd;

fn clicks_producing(
    scheduler: &Scheduler,
    tree: &Rc<NodeTree>,
    ctx: &BindingContext,
    button: NodeId,
    delays: &[u64],
) -> Binding<AsyncCmd, gestures::ButtonData> {
    let delays = RefCell::new(delays.iter().copied().collect::<VecDeque<_>>());
    let sched = scheduler.clone();
    Binder::new(ctx, gestures::button_pressed(tree).unwrap())
        .on(button)
        .to_produce(move |_| {
            let ms = delays.borrow_mut().pop_front().unwrap_or(0);
            Ok(AsyncCmd::new(&sched, Duration::from_millis(ms)))
        })
        .bind()
        .unwrap()
}

#[test]
fn completions_are_registered_in_resolution_order() {
    let scheduler = Scheduler::new();
    let tree = NodeTree::new(&scheduler);
    let ctx = BindingContext::new(&scheduler);
    let button = tree.create_node("button");
    let binding = clicks_producing(&scheduler, &tree, &ctx, button, &[100, 5]);
    let mut produced = binding.produces();

    tree.dispatch(&InputEvent::click(button)).unwrap();
    tree.dispatch(&InputEvent::click(button)).unwrap();
    assert_eq!(binding.pending_commands(), 2);
    assert_eq!(binding.times_ended(), 0);
    assert!(ctx.registry.borrow().is_empty());

    scheduler.advance(Duration::from_millis(10));
    assert_eq!(ctx.registry.borrow().names(), vec!["5ms"]);
    assert_eq!(binding.pending_commands(), 1);

    scheduler.advance(Duration::from_millis(100));
    assert_eq!(ctx.registry.borrow().names(), vec!["5ms", "100ms"]);
    assert_eq!(binding.times_ended(), 2);
    assert_eq!(binding.pending_commands(), 0);
    for cmd in ctx.registry.borrow().commands() {
        assert_eq!(cmd.borrow().status(), CmdStatus::Done);
    }

    let first = produced.try_next().unwrap().unwrap();
    assert_eq!(first.borrow().label, "5ms");
}

#[test]
fn deactivation_disowns_pending_commands() {
    let scheduler = Scheduler::new();
    let tree = NodeTree::new(&scheduler);
    let ctx = BindingContext::new(&scheduler);
    let button = tree.create_node("button");
    let ended = Rc::new(Cell::new(0));
    let counter = Rc::clone(&ended);
    let sched = scheduler.clone();
    let binding = Binder::new(&ctx, gestures::button_pressed(&tree).unwrap())
        .on(button)
        .to_produce(move |_| Ok(AsyncCmd::new(&sched, Duration::from_millis(100))))
        .end(move |_, _| counter.set(counter.get() + 1))
        .bind()
        .unwrap();
    let mut produced = binding.produces();

    tree.dispatch(&InputEvent::click(button)).unwrap();
    assert_eq!(binding.pending_commands(), 1);
    binding.activate(false);
    assert_eq!(binding.pending_commands(), 0);

    scheduler.advance(Duration::from_millis(200));

    assert_eq!(ended.get(), 0);
    assert_eq!(binding.times_ended(), 0);
    assert!(ctx.registry.borrow().is_empty());
    assert!(matches!(produced.try_next(), Err(_)));
}

#[test]
fn rejected_execution_is_reported() {
    let scheduler = Scheduler::new();
    let tree = NodeTree::new(&scheduler);
    let errors = Rc::new(ErrorLog::default());
    let ctx = BindingContext::new(&scheduler).with_error_reporter(errors.clone());
    let button = tree.create_node("button");
    let refused = Rc::new(Cell::new(0));
    let counter = Rc::clone(&refused);
    let sched = scheduler.clone();
    let binding = Binder::new(&ctx, gestures::button_pressed(&tree).unwrap())
        .on(button)
        .to_produce(move |_| Ok(AsyncCmd::failing(&sched, Duration::from_millis(20))))
        .if_cannot_execute(move |cmd: &mut AsyncCmd, _| {
            assert_eq!(cmd.status(), CmdStatus::Created);
            counter.set(counter.get() + 1);
        })
        .bind()
        .unwrap();

    tree.dispatch(&InputEvent::click(button)).unwrap();
    assert!(errors.is_empty());
    scheduler.advance(Duration::from_millis(20));

    assert_eq!(refused.get(), 1);
    assert_eq!(errors.len(), 1);
    let message = &errors.messages()[0];
    assert!(message.contains("command `20ms` failed"));
    assert!(message.contains("20ms rejected"));
    assert_eq!(binding.times_ended(), 1);
    assert!(ctx.registry.borrow().is_empty());
}

#[test]
fn a_new_cycle_runs_while_the_previous_command_is_pending() {
    let scheduler = Scheduler::new();
    let tree = NodeTree::new(&scheduler);
    let ctx = BindingContext::new(&scheduler);
    let button = tree.create_node("button");
    let binding = clicks_producing(&scheduler, &tree, &ctx, button, &[50, 50, 50]);

    for _ in 0..3 {
        assert_eq!(tree.dispatch(&InputEvent::click(button)), Ok(true));
        assert!(!binding.is_running());
    }
    assert_eq!(binding.pending_commands(), 3);

    scheduler.run_all();
    assert_eq!(ctx.registry.borrow().len(), 3);
    assert_eq!(scheduler.now(), Duration::from_millis(50));
}

struct Drag {
    scheduler: Scheduler,
    tree: Rc<NodeTree>,
    canvas: NodeId,
}

impl Drag {
    fn new() -> Self {
        let scheduler = Scheduler::new();
        let tree = NodeTree::new(&scheduler);
        let canvas = tree.create_node("canvas");
        Self {
            scheduler,
            tree,
            canvas,
        }
    }

    fn mouse(&self, kind: EventKind, x: f32) {
        self.tree
            .dispatch(&InputEvent::mouse(kind, self.canvas, 0, (x, 0.0)))
            .unwrap();
    }

    fn escape(&self) -> Result<bool, FsmError> {
        self.tree
            .dispatch(&InputEvent::key(EventKind::KeyUp, self.canvas, "Escape"))
    }
}

#[test]
fn continuous_run_resolves_while_the_command_stays_held() {
    let drag = Drag::new();
    let ctx = BindingContext::new(&drag.scheduler);
    let sched = drag.scheduler.clone();
    let binding = Binder::new(&ctx, gestures::dnd(&drag.tree, false).unwrap())
        .on(drag.canvas)
        .to_produce(move |_| Ok(AsyncCmd::new(&sched, Duration::from_millis(20))))
        .continuous_execution()
        .bind()
        .unwrap();

    drag.mouse(EventKind::MouseDown, 0.0);
    drag.mouse(EventKind::MouseMove, 10.0);
    let cmd = binding.command().unwrap();
    assert_eq!(cmd.borrow().status(), CmdStatus::Created);

    drag.scheduler.advance(Duration::from_millis(20));
    assert!(binding.command().is_some());
    assert_eq!(cmd.borrow().status(), CmdStatus::Executed);
    assert!(ctx.registry.borrow().is_empty());

    drag.mouse(EventKind::MouseUp, 10.0);
    assert_eq!(binding.pending_commands(), 1);
    drag.scheduler.advance(Duration::from_millis(20));

    assert_eq!(cmd.borrow().runs, 2);
    assert_eq!(cmd.borrow().status(), CmdStatus::Done);
    assert_eq!(ctx.registry.borrow().len(), 1);
    assert_eq!(binding.times_ended(), 1);
}

#[test]
fn failed_continuous_run_reaches_cannot_execute() {
    let drag = Drag::new();
    let errors = Rc::new(ErrorLog::default());
    let ctx = BindingContext::new(&drag.scheduler).with_error_reporter(errors.clone());
    let refused = Rc::new(Cell::new(0));
    let counter = Rc::clone(&refused);
    let sched = drag.scheduler.clone();
    let binding = Binder::new(&ctx, gestures::dnd(&drag.tree, false).unwrap())
        .on(drag.canvas)
        .to_produce(move |_| Ok(AsyncCmd::failing(&sched, Duration::from_millis(20))))
        .continuous_execution()
        .if_cannot_execute(move |_, _| counter.set(counter.get() + 1))
        .bind()
        .unwrap();

    drag.mouse(EventKind::MouseDown, 0.0);
    drag.mouse(EventKind::MouseMove, 10.0);
    drag.scheduler.advance(Duration::from_millis(20));

    assert_eq!(refused.get(), 1);
    assert_eq!(errors.len(), 1);
    assert!(errors.messages()[0].contains("20ms rejected"));
    assert!(binding.is_running());
    assert_eq!(
        binding.command().unwrap().borrow().status(),
        CmdStatus::Created
    );
}

#[test]
fn run_resolving_after_cancel_is_undone() {
    let drag = Drag::new();
    let ctx = BindingContext::new(&drag.scheduler);
    let sched = drag.scheduler.clone();
    let binding = Binder::new(&ctx, gestures::dnd(&drag.tree, true).unwrap())
        .on(drag.canvas)
        .to_produce(move |_| Ok(AsyncCmd::undoable(&sched, Duration::from_millis(50))))
        .continuous_execution()
        .bind()
        .unwrap();

    drag.mouse(EventKind::MouseDown, 0.0);
    drag.mouse(EventKind::MouseMove, 10.0);
    drag.mouse(EventKind::MouseMove, 20.0);
    let cmd = binding.command().unwrap();
    assert_eq!(drag.escape(), Ok(true));
    assert_eq!(cmd.borrow().status(), CmdStatus::Cancelled);
    assert_eq!(cmd.borrow().undone, 0);

    drag.scheduler.advance(Duration::from_millis(100));

    // Two late runs, one undo once both are in.
    assert_eq!(cmd.borrow().runs, 2);
    assert_eq!(cmd.borrow().undone, 1);
    assert_eq!(cmd.borrow().status(), CmdStatus::Cancelled);
    assert_eq!(binding.times_cancelled(), 1);
    assert!(ctx.registry.borrow().is_empty());
}

#[test]
fn run_resolving_after_cancel_without_undo_is_reported() {
    let drag = Drag::new();
    let errors = Rc::new(ErrorLog::default());
    let ctx = BindingContext::new(&drag.scheduler).with_error_reporter(errors.clone());
    let sched = drag.scheduler.clone();
    let binding = Binder::new(&ctx, gestures::dnd(&drag.tree, true).unwrap())
        .on(drag.canvas)
        .to_produce(move |_| Ok(AsyncCmd::new(&sched, Duration::from_millis(50))))
        .continuous_execution()
        .bind()
        .unwrap();

    drag.mouse(EventKind::MouseDown, 0.0);
    drag.mouse(EventKind::MouseMove, 10.0);
    let cmd = binding.command().unwrap();
    assert_eq!(drag.escape(), Ok(true));
    assert!(errors.is_empty());

    drag.scheduler.advance(Duration::from_millis(100));

    assert_eq!(cmd.borrow().status(), CmdStatus::Cancelled);
    assert_eq!(errors.len(), 1);
    assert!(errors.messages()[0].contains("is not undoable"));
    assert!(!binding.is_running());
}

#[test]
fn failed_late_run_needs_no_undo() {
    let drag = Drag::new();
    let errors = Rc::new(ErrorLog::default());
    let ctx = BindingContext::new(&drag.scheduler).with_error_reporter(errors.clone());
    let sched = drag.scheduler.clone();
    let binding = Binder::new(&ctx, gestures::dnd(&drag.tree, true).unwrap())
        .on(drag.canvas)
        .to_produce(move |_| Ok(AsyncCmd::failing(&sched, Duration::from_millis(50))))
        .continuous_execution()
        .bind()
        .unwrap();

    drag.mouse(EventKind::MouseDown, 0.0);
    drag.mouse(EventKind::MouseMove, 10.0);
    let cmd = binding.command().unwrap();
    drag.escape().unwrap();
    drag.scheduler.advance(Duration::from_millis(100));

    assert_eq!(cmd.borrow().status(), CmdStatus::Cancelled);
    // Only the rejection itself is reported.
    assert_eq!(errors.len(), 1);
    assert!(errors.messages()[0].contains("50ms rejected"));
}
