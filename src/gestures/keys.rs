use crate::error::FsmError;
use crate::event::{EventKind, InputEvent};
use crate::fsm::{Fsm, TimeoutTransition, Transition};
use crate::interaction::{Interaction, InteractionData};
use crate::source::{NodeId, NodeTree};
use std::rc::Rc;
use std::time::Duration;

/// Idle delay that ends a key sequence.
pub const KEYS_TYPED_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeysData {
    pub keys: Vec<String>,
    pub target: Option<NodeId>,
}

impl InteractionData for KeysData {
    fn flush(&mut self) {
        self.keys.clear();
        self.target = None;
    }
}

fn add_key(event: &InputEvent, data: &mut KeysData) {
    data.target = Some(event.target);
    if let Some(code) = event.key_code() {
        data.keys.push(code.to_string());
    }
}

pub fn keys_typed_fsm(gap: Duration) -> Result<Fsm<KeysData>, FsmError> {
    let mut fsm = Fsm::new();
    fsm.build(|fsm| {
        let init = fsm.initial();
        let keyup = fsm.add_std_state("keyup");
        let timeouted = fsm.add_terminal_state("timeouted");
        fsm.add_transition(init, Transition::new(keyup, [EventKind::KeyUp]).with_action(add_key))?;
        fsm.add_transition(keyup, Transition::new(keyup, [EventKind::KeyUp]).with_action(add_key))?;
        fsm.add_timeout(keyup, TimeoutTransition::new(timeouted, gap))
    })?;
    Ok(fsm)
}

/// Keys released in sequence; ends once no key is released for a while.
pub fn keys_typed(tree: &Rc<NodeTree>) -> Result<Interaction<KeysData>, FsmError> {
    keys_typed_with_timeout(tree, KEYS_TYPED_TIMEOUT)
}

pub fn keys_typed_with_timeout(
    tree: &Rc<NodeTree>,
    gap: Duration,
) -> Result<Interaction<KeysData>, FsmError> {
    Ok(Interaction::new(
        "keys_typed",
        keys_typed_fsm(gap)?,
        KeysData::default(),
        tree,
    ))
}
