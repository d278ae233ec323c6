use crate::error::FsmError;
use crate::event::{EventKind, InputEvent, Point};
use crate::fsm::{Fsm, TimeoutTransition, Transition};
use crate::interaction::{Interaction, InteractionData};
use crate::source::{NodeId, NodeTree};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LongTouchData {
    pub id: Option<u32>,
    pub point: Option<Point>,
    pub target: Option<NodeId>,
}

impl InteractionData for LongTouchData {
    fn flush(&mut self) {
        *self = LongTouchData::default();
    }
}

fn same_touch(event: &InputEvent, data: &LongTouchData) -> bool {
    data.id == event.touch_id()
}

/// A touch held for `duration`. Moving or releasing earlier cancels.
pub fn long_touch_fsm(duration: Duration) -> Result<Fsm<LongTouchData>, FsmError> {
    let mut fsm = Fsm::new();
    fsm.build(|fsm| {
        let init = fsm.initial();
        let touched = fsm.add_std_state("touched");
        let timeouted = fsm.add_terminal_state("timeouted");
        let released = fsm.add_cancelling_state("released");

        fsm.add_transition(
            init,
            Transition::new(touched, [EventKind::TouchStart]).with_action(
                |event, data: &mut LongTouchData| {
                    data.id = event.touch_id();
                    data.point = event.point();
                    data.target = Some(event.target);
                },
            ),
        )?;
        fsm.add_transition(
            touched,
            Transition::new(released, [EventKind::TouchEnd, EventKind::TouchMove])
                .guarded(same_touch),
        )?;
        fsm.add_timeout(touched, TimeoutTransition::new(timeouted, duration))
    })?;
    Ok(fsm)
}

pub fn long_touch(
    tree: &Rc<NodeTree>,
    duration: Duration,
) -> Result<Interaction<LongTouchData>, FsmError> {
    Ok(Interaction::new(
        "long_touch",
        long_touch_fsm(duration)?,
        LongTouchData::default(),
        tree,
    ))
}
