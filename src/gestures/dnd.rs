use crate::error::FsmError;
use crate::event::{EventKind, InputEvent, Point};
use crate::fsm::{Fsm, Transition};
use crate::interaction::{Interaction, InteractionData};
use crate::source::{NodeId, NodeTree};
use std::rc::Rc;

pub const ESCAPE: &str = "Escape";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DndData {
    pub button: Option<u8>,
    pub src: Option<Point>,
    pub tgt: Option<Point>,
    pub src_node: Option<NodeId>,
    pub tgt_node: Option<NodeId>,
}

impl DndData {
    /// Offset between the press point and the latest point.
    pub fn diff(&self) -> Option<Point> {
        let (src, tgt) = (self.src?, self.tgt?);
        Some(Point {
            x: tgt.x - src.x,
            y: tgt.y - src.y,
        })
    }
}

impl InteractionData for DndData {
    fn flush(&mut self) {
        *self = DndData::default();
    }
}

fn same_button(event: &InputEvent, data: &DndData) -> bool {
    data.button == event.button()
}

fn move_to(event: &InputEvent, data: &mut DndData) {
    data.tgt = event.point();
    data.tgt_node = Some(event.target);
}

/// Press, move at least once, release. The gesture only starts with the
/// first move: a press released in place is cancelled silently.
pub fn dnd_fsm(cancellable: bool) -> Result<Fsm<DndData>, FsmError> {
    let mut fsm = Fsm::new();
    fsm.build(|fsm| {
        let init = fsm.initial();
        let pressed = fsm.add_std_state("pressed");
        let dragged = fsm.add_std_state("dragged");
        let released = fsm.add_terminal_state("released");
        let cancelled = fsm.add_cancelling_state("cancelled");

        fsm.add_transition(
            init,
            Transition::new(pressed, [EventKind::MouseDown]).with_action(
                |event, data: &mut DndData| {
                    data.button = event.button();
                    data.src = event.point();
                    data.tgt = event.point();
                    data.src_node = Some(event.target);
                    data.tgt_node = Some(event.target);
                },
            ),
        )?;
        fsm.add_transition(
            pressed,
            Transition::new(cancelled, [EventKind::MouseUp]).guarded(same_button),
        )?;
        fsm.add_transition(
            pressed,
            Transition::new(dragged, [EventKind::MouseMove])
                .guarded(same_button)
                .with_action(move_to),
        )?;
        fsm.add_transition(
            dragged,
            Transition::new(dragged, [EventKind::MouseMove])
                .guarded(same_button)
                .with_action(move_to),
        )?;
        fsm.add_transition(
            dragged,
            Transition::new(released, [EventKind::MouseUp])
                .guarded(same_button)
                .with_action(move_to),
        )?;
        if cancellable {
            fsm.add_transition(
                dragged,
                Transition::new(cancelled, [EventKind::KeyUp])
                    .accepting(|event| event.key_code() == Some(ESCAPE)),
            )?;
        }
        fsm.set_starting_state(dragged)
    })?;
    Ok(fsm)
}

pub fn dnd(tree: &Rc<NodeTree>, cancellable: bool) -> Result<Interaction<DndData>, FsmError> {
    Ok(Interaction::new(
        "dnd",
        dnd_fsm(cancellable)?,
        DndData::default(),
        tree,
    ))
}
