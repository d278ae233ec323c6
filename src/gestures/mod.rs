//! Ready-made gestures. Each module builds one FSM and wraps it in an
//! [`Interaction`](crate::interaction::Interaction).

pub mod button;
pub mod dnd;
pub mod keys;
pub mod long_touch;
pub mod tap;

pub use button::{button_pressed, ButtonData};
pub use dnd::{dnd, DndData};
pub use keys::{keys_typed, keys_typed_with_timeout, KeysData};
pub use long_touch::{long_touch, LongTouchData};
pub use tap::{tap, tap_with_timeout, TapData};

use crate::error::FsmError;
use crate::interaction::Interaction;
use crate::settings::GestureSettings;
use crate::source::NodeTree;
use std::rc::Rc;

/// Creates gestures on one tree with the timings of [`GestureSettings`].
#[derive(Clone)]
pub struct Gestures {
    tree: Rc<NodeTree>,
    settings: GestureSettings,
}

impl Gestures {
    pub fn new(tree: &Rc<NodeTree>, settings: GestureSettings) -> Self {
        Self {
            tree: Rc::clone(tree),
            settings,
        }
    }

    pub fn settings(&self) -> &GestureSettings {
        &self.settings
    }

    pub fn button_pressed(&self) -> Result<Interaction<ButtonData>, FsmError> {
        button_pressed(&self.tree)
    }

    pub fn tap(&self, count: usize) -> Result<Interaction<TapData>, FsmError> {
        tap_with_timeout(&self.tree, count, self.settings.tap_timeout())
    }

    pub fn keys_typed(&self) -> Result<Interaction<KeysData>, FsmError> {
        keys_typed_with_timeout(&self.tree, self.settings.keys_typed_timeout())
    }

    pub fn dnd(&self, cancellable: bool) -> Result<Interaction<DndData>, FsmError> {
        dnd(&self.tree, cancellable)
    }

    pub fn long_touch(&self) -> Result<Interaction<LongTouchData>, FsmError> {
        long_touch(&self.tree, self.settings.long_touch())
    }
}
