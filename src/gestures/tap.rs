use crate::error::FsmError;
use crate::event::{EventKind, InputEvent, Point};
use crate::fsm::{Fsm, TimeoutTransition, Transition};
use crate::interaction::{Interaction, InteractionData};
use crate::source::{NodeId, NodeTree};
use std::rc::Rc;
use std::time::Duration;

pub const TAP_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapPoint {
    pub id: u32,
    pub point: Point,
    pub target: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TapData {
    /// Completed taps, oldest first.
    pub taps: Vec<TapPoint>,
    /// Touch currently down, if any.
    pub touched: Option<TapPoint>,
}

impl InteractionData for TapData {
    fn flush(&mut self) {
        self.taps.clear();
        self.touched = None;
    }
}

fn touch_of(event: &InputEvent) -> Option<TapPoint> {
    Some(TapPoint {
        id: event.touch_id()?,
        point: event.point()?,
        target: event.target,
    })
}

fn same_touch(event: &InputEvent, data: &TapData) -> bool {
    data.touched.map(|t| t.id) == event.touch_id()
}

/// `count` successive taps, each shorter than `timeout`, with no move while
/// a finger is down. A `count` of zero is treated as one.
pub fn tap_fsm(count: usize, timeout: Duration) -> Result<Fsm<TapData>, FsmError> {
    let count = count.max(1);
    let mut fsm = Fsm::new();
    fsm.build(|fsm| {
        let init = fsm.initial();
        let touched = fsm.add_std_state("touched");
        let tapped = fsm.add_std_state("tapped");
        let ended = fsm.add_terminal_state("ended");
        let cancelled = fsm.add_cancelling_state("cancelled");

        let record_touch = |event: &InputEvent, data: &mut TapData| {
            data.touched = touch_of(event);
        };
        let record_tap = |_: &InputEvent, data: &mut TapData| {
            if let Some(tap) = data.touched.take() {
                data.taps.push(tap);
            }
        };

        fsm.add_transition(
            init,
            Transition::new(touched, [EventKind::TouchStart]).with_action(record_touch),
        )?;
        fsm.add_transition(
            touched,
            Transition::new(ended, [EventKind::TouchEnd])
                .guarded(move |event, data: &TapData| {
                    same_touch(event, data) && data.taps.len() + 1 >= count
                })
                .with_action(record_tap),
        )?;
        fsm.add_transition(
            touched,
            Transition::new(tapped, [EventKind::TouchEnd])
                .guarded(same_touch)
                .with_action(record_tap),
        )?;
        fsm.add_transition(
            touched,
            Transition::new(cancelled, [EventKind::TouchMove]).guarded(same_touch),
        )?;
        fsm.add_transition(
            tapped,
            Transition::new(touched, [EventKind::TouchStart]).with_action(record_touch),
        )?;
        fsm.add_timeout(touched, TimeoutTransition::new(cancelled, timeout))?;
        fsm.add_timeout(tapped, TimeoutTransition::new(cancelled, timeout))
    })?;
    Ok(fsm)
}

pub fn tap(tree: &Rc<NodeTree>, count: usize) -> Result<Interaction<TapData>, FsmError> {
    tap_with_timeout(tree, count, TAP_TIMEOUT)
}

pub fn tap_with_timeout(
    tree: &Rc<NodeTree>,
    count: usize,
    timeout: Duration,
) -> Result<Interaction<TapData>, FsmError> {
    Ok(Interaction::new(
        "tap",
        tap_fsm(count, timeout)?,
        TapData::default(),
        tree,
    ))
}
