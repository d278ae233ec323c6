use crate::error::FsmError;
use crate::event::{EventKind, InputEvent};
use crate::scheduler::Scheduler;
use slab::Slab;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

pub type Listener = Rc<dyn Fn(&InputEvent) -> Result<(), FsmError>>;

/// Nodes added to or removed from an observed subtree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mutation {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

pub type MutationObserver = Rc<dyn Fn(&Mutation)>;

struct NodeEntry {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct ListenerEntry {
    node: NodeId,
    kind: EventKind,
    callback: Listener,
}

struct ObserverEntry {
    root: NodeId,
    callback: MutationObserver,
}

/// Host of the input sources gestures listen to.
///
/// A tree of nodes, listeners registered per node and event kind, and
/// subtree observers. Observers are notified through scheduler microtasks,
/// never synchronously with the mutation.
pub struct NodeTree {
    me: Weak<NodeTree>,
    scheduler: Scheduler,
    nodes: RefCell<Slab<NodeEntry>>,
    listeners: RefCell<Slab<ListenerEntry>>,
    observers: RefCell<Slab<ObserverEntry>>,
}

impl NodeTree {
    pub fn new(scheduler: &Scheduler) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            scheduler: scheduler.clone(),
            nodes: RefCell::new(Slab::new()),
            listeners: RefCell::new(Slab::new()),
            observers: RefCell::new(Slab::new()),
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Creates a detached node.
    pub fn create_node(&self, name: impl Into<String>) -> NodeId {
        let key = self.nodes.borrow_mut().insert(NodeEntry {
            name: name.into(),
            parent: None,
            children: Vec::new(),
        });
        NodeId(key)
    }

    pub fn name(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow().get(node.0).map(|entry| entry.name.clone())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.0).and_then(|entry| entry.parent)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|entry| entry.children.clone())
            .unwrap_or_default()
    }

    /// True when `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = nodes.get(current.0).and_then(|entry| entry.parent);
        }
        false
    }

    /// Attaches `child` under `parent`, detaching it from its previous parent.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || self.contains(child, parent) {
            tracing::warn!(%parent, %child, "refusing to create a node cycle");
            return false;
        }
        if !self.nodes.borrow().contains(parent.0) || !self.nodes.borrow().contains(child.0) {
            return false;
        }
        if let Some(previous) = self.parent(child) {
            self.remove_child(previous, child);
        }
        {
            let mut nodes = self.nodes.borrow_mut();
            nodes[parent.0].children.push(child);
            nodes[child.0].parent = Some(parent);
        }
        self.notify(
            parent,
            Mutation {
                added: vec![child],
                removed: Vec::new(),
            },
        );
        true
    }

    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> bool {
        {
            let mut nodes = self.nodes.borrow_mut();
            let Some(entry) = nodes.get_mut(parent.0) else {
                return false;
            };
            let Some(pos) = entry.children.iter().position(|c| *c == child) else {
                return false;
            };
            entry.children.remove(pos);
            if let Some(child_entry) = nodes.get_mut(child.0) {
                child_entry.parent = None;
            }
        }
        self.notify(
            parent,
            Mutation {
                added: Vec::new(),
                removed: vec![child],
            },
        );
        true
    }

    pub fn add_listener(&self, node: NodeId, kind: EventKind, callback: Listener) -> ListenerId {
        let key = self.listeners.borrow_mut().insert(ListenerEntry {
            node,
            kind,
            callback,
        });
        ListenerId(key)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().try_remove(id.0).is_some()
    }

    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(_, entry)| entry.node == node)
            .count()
    }

    pub fn has_listener(&self, node: NodeId, kind: EventKind) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|(_, entry)| entry.node == node && entry.kind == kind)
    }

    /// Delivers `event` to the listeners of its target for its kind.
    ///
    /// Returns whether at least one listener received it. The first listener
    /// error stops the delivery and is returned to the caller.
    pub fn dispatch(&self, event: &InputEvent) -> Result<bool, FsmError> {
        let callbacks: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, entry)| entry.node == event.target && entry.kind == event.kind)
            .map(|(_, entry)| Rc::clone(&entry.callback))
            .collect();
        for callback in &callbacks {
            callback(event)?;
        }
        Ok(!callbacks.is_empty())
    }

    /// Observes additions and removals anywhere under `root`.
    pub fn observe(&self, root: NodeId, callback: MutationObserver) -> ObserverId {
        let key = self
            .observers
            .borrow_mut()
            .insert(ObserverEntry { root, callback });
        ObserverId(key)
    }

    pub fn disconnect(&self, id: ObserverId) -> bool {
        self.observers.borrow_mut().try_remove(id.0).is_some()
    }

    fn notify(&self, parent: NodeId, mutation: Mutation) {
        let targets: Vec<ObserverId> = self
            .observers
            .borrow()
            .iter()
            .map(|(key, entry)| (ObserverId(key), entry.root))
            .filter(|(_, root)| self.contains(*root, parent))
            .map(|(id, _)| id)
            .collect();
        for id in targets {
            let tree = self.me.clone();
            let mutation = mutation.clone();
            self.scheduler.queue_microtask(move || {
                let Some(tree) = tree.upgrade() else {
                    return;
                };
                let callback = tree
                    .observers
                    .borrow()
                    .get(id.0)
                    .map(|entry| Rc::clone(&entry.callback));
                // Disconnected before the microtask ran.
                if let Some(callback) = callback {
                    callback(&mutation);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn dispatch_reaches_only_matching_listeners() {
        let scheduler = Scheduler::new();
        let tree = NodeTree::new(&scheduler);
        let button = tree.create_node("button");
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        tree.add_listener(
            button,
            EventKind::Click,
            Rc::new(move |_| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
        );

        assert_eq!(tree.dispatch(&InputEvent::click(button)), Ok(true));
        let other = tree.create_node("other");
        assert_eq!(tree.dispatch(&InputEvent::click(other)), Ok(false));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn observers_are_notified_asynchronously() {
        let scheduler = Scheduler::new();
        let tree = NodeTree::new(&scheduler);
        let root = tree.create_node("root");
        let child = tree.create_node("child");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        tree.observe(
            root,
            Rc::new(move |mutation| sink.borrow_mut().push(mutation.clone())),
        );

        assert!(tree.append_child(root, child));
        assert!(seen.borrow().is_empty());
        scheduler.flush();
        assert_eq!(seen.borrow()[0].added, vec![child]);
    }

    #[test]
    fn append_child_rejects_cycles() {
        let scheduler = Scheduler::new();
        let tree = NodeTree::new(&scheduler);
        let a = tree.create_node("a");
        let b = tree.create_node("b");
        assert!(tree.append_child(a, b));
        assert!(!tree.append_child(b, a));
        assert!(tree.contains(a, b));
    }
}
