use gesture_binder::binding::BindingContext;
use gesture_binder::command::AnonCmd;
use gesture_binder::event::{EventKind, InputEvent};
use gesture_binder::gestures;
use gesture_binder::logging::{self, LogLevel};
use gesture_binder::scheduler::Scheduler;
use gesture_binder::source::NodeTree;
use gesture_binder::Binder;
use serial_test::serial;

#[test]
#[serial]
fn init_twice_keeps_the_first_subscriber() {
    logging::init(true);
    logging::init(false);
    tracing::info!("still logging");
}

#[test]
#[serial]
fn verbose_binding_logs_a_click() {
    logging::init(true);
    let scheduler = Scheduler::new();
    let tree = NodeTree::new(&scheduler);
    let ctx = BindingContext::new(&scheduler);
    let button = tree.create_node("button");
    let binding = Binder::new(&ctx, gestures::button_pressed(&tree).unwrap())
        .on(button)
        .to_produce(|_| Ok(AnonCmd::named("save", || {})))
        .log(LogLevel::Interaction)
        .log(LogLevel::Binding)
        .log(LogLevel::Command)
        .log(LogLevel::Usage)
        .bind()
        .unwrap();

    assert_eq!(tree.dispatch(&InputEvent::click(button)), Ok(true));

    assert_eq!(binding.times_ended(), 1);
    assert_eq!(ctx.registry.borrow().names(), vec!["save"]);
}

#[test]
#[serial]
fn context_levels_apply_to_bindings_without_their_own() {
    logging::init(true);
    let scheduler = Scheduler::new();
    let tree = NodeTree::new(&scheduler);
    let mut ctx = BindingContext::new(&scheduler);
    ctx.log_levels = vec![LogLevel::Command, LogLevel::Interaction];
    let canvas = tree.create_node("canvas");
    let binding = Binder::new(&ctx, gestures::dnd(&tree, true).unwrap())
        .on(canvas)
        .to_produce(|_| Ok(AnonCmd::new(|| {})))
        .bind()
        .unwrap();

    tree.dispatch(&InputEvent::mouse(EventKind::MouseDown, canvas, 0, (0.0, 0.0)))
        .unwrap();
    tree.dispatch(&InputEvent::mouse(EventKind::MouseMove, canvas, 0, (4.0, 0.0)))
        .unwrap();
    tree.dispatch(&InputEvent::key(EventKind::KeyUp, canvas, "Escape"))
        .unwrap();

    assert_eq!(binding.times_cancelled(), 1);
    assert!(LogLevel::enabled(&ctx.log_levels, LogLevel::Command));
    assert!(!LogLevel::enabled(&ctx.log_levels, LogLevel::Usage));
}

#[test]
fn log_levels_use_snake_case_names() {
    let json = serde_json::to_string(&[LogLevel::Interaction, LogLevel::Usage]).unwrap();
    assert_eq!(json, r#"["interaction","usage"]"#);
    let parsed: Vec<LogLevel> = serde_json::from_str(r#"["binding","command"]"#).unwrap();
    assert_eq!(parsed, vec![LogLevel::Binding, LogLevel::Command]);
}
