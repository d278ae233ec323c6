pub mod binder;
pub mod binding;
pub mod command;
pub mod error;
pub mod event;
pub mod fsm;
pub mod gestures;
pub mod interaction;
pub mod logging;
pub mod scheduler;
pub mod settings;
pub mod source;

pub use binder::Binder;
pub use binding::{Binding, BindingConfig, BindingContext};
pub use error::{BindError, FsmError};
pub use event::{EventKind, InputEvent, Point};
pub use interaction::{Interaction, InteractionData};
pub use scheduler::Scheduler;
pub use source::{NodeId, NodeTree};
