use crate::error::FsmError;
use crate::event::EventKind;
use crate::fsm::{Fsm, Transition};
use crate::interaction::{Interaction, InteractionData};
use crate::source::{NodeId, NodeTree};
use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonData {
    pub widget: Option<NodeId>,
    pub button: Option<u8>,
}

impl InteractionData for ButtonData {
    fn flush(&mut self) {
        self.widget = None;
        self.button = None;
    }
}

pub fn button_pressed_fsm() -> Result<Fsm<ButtonData>, FsmError> {
    let mut fsm = Fsm::new();
    fsm.build(|fsm| {
        let pressed = fsm.add_terminal_state("pressed");
        let init = fsm.initial();
        fsm.add_transition(
            init,
            Transition::new(pressed, [EventKind::Click, EventKind::AuxClick]).with_action(
                |event, data: &mut ButtonData| {
                    data.widget = Some(event.target);
                    data.button = event.button();
                },
            ),
        )
    })?;
    Ok(fsm)
}

/// One click on a widget. Starts and stops on the same event.
pub fn button_pressed(tree: &Rc<NodeTree>) -> Result<Interaction<ButtonData>, FsmError> {
    Ok(Interaction::new(
        "button_pressed",
        button_pressed_fsm()?,
        ButtonData::default(),
        tree,
    ))
}
