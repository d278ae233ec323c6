use crate::error::FsmError;
use crate::event::InputEvent;
use crate::fsm::{Fsm, FsmHandler, StateId};
use crate::scheduler::Scheduler;
use crate::source::{ListenerId, Mutation, NodeId, NodeTree, ObserverId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Data accumulated by a gesture while it runs.
pub trait InteractionData {
    /// Forgets everything the gesture collected. Called on every reset.
    fn flush(&mut self);
}

impl InteractionData for () {
    fn flush(&mut self) {}
}

struct InteractionCore<D> {
    name: String,
    fsm: Fsm<D>,
    data: D,
    activated: bool,
    registrations: HashMap<NodeId, Vec<ListenerId>>,
    observers: Vec<ObserverId>,
    deferred_error: Option<FsmError>,
    log: bool,
}

impl<D: InteractionData> InteractionCore<D> {
    fn reinit(&mut self) {
        let InteractionCore { fsm, data, .. } = self;
        fsm.reinit(data);
    }
}

/// A gesture recognizer bound to input sources of a [`NodeTree`].
///
/// Cloning yields another handle on the same interaction. Listeners and
/// observers installed in the tree only hold weak references to it.
pub struct Interaction<D> {
    core: Rc<RefCell<InteractionCore<D>>>,
    tree: Rc<NodeTree>,
}

impl<D> Clone for Interaction<D> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
            tree: Rc::clone(&self.tree),
        }
    }
}

impl<D: InteractionData + 'static> Interaction<D> {
    pub fn new(name: impl Into<String>, fsm: Fsm<D>, data: D, tree: &Rc<NodeTree>) -> Self {
        let core = Rc::new(RefCell::new(InteractionCore {
            name: name.into(),
            fsm,
            data,
            activated: true,
            registrations: HashMap::new(),
            observers: Vec::new(),
            deferred_error: None,
            log: false,
        }));
        let weak = Rc::downgrade(&core);
        core.borrow_mut().fsm.set_timer_driver(
            tree.scheduler().clone(),
            Rc::new(move || {
                if let Some(core) = weak.upgrade() {
                    fire_timeout(&core);
                }
            }),
        );
        Self {
            core,
            tree: Rc::clone(tree),
        }
    }

    pub fn name(&self) -> String {
        self.core.borrow().name.clone()
    }

    pub fn tree(&self) -> &Rc<NodeTree> {
        &self.tree
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.tree.scheduler()
    }

    /// Listens to `node` for every event kind the FSM accepts.
    pub fn register_to_node(&self, node: NodeId) {
        if self.is_registered(node) {
            return;
        }
        let kinds = self.core.borrow().fsm.accepted_events();
        let ids: Vec<ListenerId> = kinds
            .into_iter()
            .map(|kind| {
                let weak = Rc::downgrade(&self.core);
                self.tree.add_listener(
                    node,
                    kind,
                    Rc::new(move |event: &InputEvent| match weak.upgrade() {
                        Some(core) => process_with(&core, event).map(|_| ()),
                        None => Ok(()),
                    }),
                )
            })
            .collect();
        let mut core = self.core.borrow_mut();
        if core.log {
            tracing::info!(interaction = %core.name, %node, "registered to node");
        }
        core.registrations.insert(node, ids);
    }

    pub fn register_to_nodes(&self, nodes: impl IntoIterator<Item = NodeId>) {
        for node in nodes {
            self.register_to_node(node);
        }
    }

    /// Detaches the listeners of `node` immediately. Events dispatched to it
    /// afterwards never reach the FSM, even mid-gesture.
    pub fn unregister_from_node(&self, node: NodeId) {
        let ids = self.core.borrow_mut().registrations.remove(&node);
        for id in ids.into_iter().flatten() {
            self.tree.remove_listener(id);
        }
    }

    /// Registers every node currently under `root`, then follows the subtree.
    ///
    /// Nodes added or removed later are (un)registered when the tree's
    /// mutation microtasks run, not during the mutation itself.
    pub fn register_to_observed(&self, root: NodeId) {
        for node in descendants(&self.tree, root) {
            self.register_to_node(node);
        }
        let weak_core = Rc::downgrade(&self.core);
        let weak_tree = Rc::downgrade(&self.tree);
        let id = self.tree.observe(
            root,
            Rc::new(move |mutation: &Mutation| {
                let (Some(core), Some(tree)) = (weak_core.upgrade(), weak_tree.upgrade()) else {
                    return;
                };
                let interaction = Interaction { core, tree };
                for removed in &mutation.removed {
                    interaction.unregister_from_node(*removed);
                    for node in descendants(&interaction.tree, *removed) {
                        interaction.unregister_from_node(node);
                    }
                }
                for added in &mutation.added {
                    interaction.register_to_node(*added);
                    for node in descendants(&interaction.tree, *added) {
                        interaction.register_to_node(node);
                    }
                }
            }),
        );
        self.core.borrow_mut().observers.push(id);
    }

    pub fn is_registered(&self, node: NodeId) -> bool {
        self.core.borrow().registrations.contains_key(&node)
    }

    pub fn registered_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.core.borrow().registrations.keys().copied().collect();
        nodes.sort();
        nodes
    }

    /// Feeds `event` to the FSM. Ignored while deactivated.
    pub fn process_event(&self, event: &InputEvent) -> Result<bool, FsmError> {
        process_with(&self.core, event)
    }

    pub fn is_activated(&self) -> bool {
        self.core.borrow().activated
    }

    /// Deactivating also resets the gesture.
    pub fn set_activated(&self, activated: bool) {
        let mut core = self.core.borrow_mut();
        core.activated = activated;
        if !activated {
            core.reinit();
        }
    }

    pub fn is_running(&self) -> bool {
        let core = self.core.borrow();
        core.activated && core.fsm.is_started()
    }

    /// Back to not-started with flushed data, whatever the current phase.
    pub fn full_reinit(&self) {
        self.core.borrow_mut().reinit();
    }

    pub fn current_state(&self) -> StateId {
        self.core.borrow().fsm.current_state()
    }

    pub fn current_state_name(&self) -> String {
        self.core.borrow().fsm.current_state_name().to_string()
    }

    pub fn with_data<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.core.borrow().data)
    }

    /// Like [`Interaction::with_data`], but `None` while the FSM is
    /// processing an event.
    pub(crate) fn try_with_data<R>(&self, f: impl FnOnce(&D) -> R) -> Option<R> {
        self.core.try_borrow().ok().map(|core| f(&core.data))
    }

    pub fn with_fsm<R>(&self, f: impl FnOnce(&Fsm<D>) -> R) -> R {
        f(&self.core.borrow().fsm)
    }

    pub fn add_handler(&self, handler: Rc<dyn FsmHandler<D>>) {
        self.core.borrow_mut().fsm.add_handler(handler);
    }

    pub fn remove_handler(&self, handler: &Rc<dyn FsmHandler<D>>) -> bool {
        self.core.borrow_mut().fsm.remove_handler(handler)
    }

    pub fn set_log(&self, log: bool) {
        let mut core = self.core.borrow_mut();
        core.log = log;
        core.fsm.set_log(log);
    }

    /// Error raised by a timeout transition, which has no caller to return
    /// it to.
    pub fn take_deferred_error(&self) -> Option<FsmError> {
        self.core.borrow_mut().deferred_error.take()
    }

    /// Detaches from every node and observer, drops the FSM handlers and
    /// deactivates. Not reversible by registering again: handlers are gone.
    pub fn uninstall(&self) {
        let (registrations, observers) = {
            let mut core = self.core.borrow_mut();
            core.activated = false;
            core.reinit();
            core.fsm.clear_handlers();
            (
                std::mem::take(&mut core.registrations),
                std::mem::take(&mut core.observers),
            )
        };
        for id in registrations.into_values().flatten() {
            self.tree.remove_listener(id);
        }
        for id in observers {
            self.tree.disconnect(id);
        }
    }
}

fn process_with<D: InteractionData>(
    core: &Rc<RefCell<InteractionCore<D>>>,
    event: &InputEvent,
) -> Result<bool, FsmError> {
    let Ok(mut core) = core.try_borrow_mut() else {
        tracing::warn!(kind = ?event.kind, target = %event.target, "interaction busy, event dropped");
        return Ok(false);
    };
    if !core.activated {
        return Ok(false);
    }
    if core.log {
        tracing::info!(interaction = %core.name, kind = ?event.kind, target = %event.target, "processing event");
    }
    let InteractionCore { fsm, data, .. } = &mut *core;
    fsm.process(event, data)
}

fn fire_timeout<D: InteractionData>(core: &Rc<RefCell<InteractionCore<D>>>) {
    let Ok(mut core) = core.try_borrow_mut() else {
        tracing::warn!("timeout fired while the interaction was busy");
        return;
    };
    if !core.activated {
        return;
    }
    let InteractionCore { fsm, data, .. } = &mut *core;
    match fsm.on_timeout(data) {
        Ok(_) => {}
        Err(FsmError::Cancelled) => {}
        Err(err) => {
            tracing::error!(?err, interaction = %core.name, "timeout transition failed");
            core.deferred_error = Some(err);
        }
    }
}

fn descendants(tree: &NodeTree, root: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack = tree.children(root);
    while let Some(node) = stack.pop() {
        stack.extend(tree.children(node));
        found.push(node);
    }
    found
}
