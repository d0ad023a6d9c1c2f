//! Synchronous change notification
//!
//! Every structural or property mutation of a node reachable from the
//! document root is delivered, in mutation order and on the calling thread,
//! to each registered [`ChangeListener`]. Detached subtrees are silent until
//! they are attached.

use std::cell::RefCell;
use std::rc::Rc;

use crate::tree::{Document, NodeId};
use crate::value::PropertyValue;

/// Property name reported when a plugin is attached or replaced
pub const ADD_EXTENSION: &str = "addExtension";

/// Change notification
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    /// Fired after `node` was linked into the tree
    Added { node: NodeId },
    /// Fired before `node` is unlinked; `subtree` lists every removed node in
    /// pre-order, starting with `node`
    Removed {
        node: NodeId,
        previous_parent: Option<NodeId>,
        subtree: Vec<NodeId>,
    },
    /// Fired after a property changed value; `namespace` names the plugin
    /// when the property belongs to one
    PropertyChanged {
        node: NodeId,
        namespace: Option<String>,
        property: String,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    },
}

impl ChangeEvent {
    pub fn node(&self) -> NodeId {
        match self {
            Self::Added { node }
            | Self::Removed { node, .. }
            | Self::PropertyChanged { node, .. } => *node,
        }
    }
}

/// Subscriber to document changes
///
/// Listeners see the document read-only and cannot re-enter the bus.
pub trait ChangeListener {
    fn node_added(&mut self, _doc: &Document, _node: NodeId) {}

    fn node_removed(
        &mut self,
        _doc: &Document,
        _node: NodeId,
        _previous_parent: Option<NodeId>,
        _subtree: &[NodeId],
    ) {
    }

    fn property_changed(&mut self, _doc: &Document, _event: &ChangeEvent) {}
}

/// Handle returned by listener registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) type SharedListener = Rc<RefCell<dyn ChangeListener>>;

/// Registered listeners in registration order
#[derive(Default)]
pub(crate) struct ListenerList {
    next_id: u64,
    entries: Vec<(ListenerId, SharedListener)>,
}

impl ListenerList {
    pub(crate) fn add(&mut self, listener: SharedListener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot so delivery is unaffected by registration changes
    pub(crate) fn snapshot(&self) -> Vec<SharedListener> {
        self.entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }
}

impl std::fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("len", &self.len())
            .finish()
    }
}

/// Deliver one event to one listener
pub(crate) fn dispatch(listener: &mut dyn ChangeListener, doc: &Document, event: &ChangeEvent) {
    match event {
        ChangeEvent::Added { node } => listener.node_added(doc, *node),
        ChangeEvent::Removed {
            node,
            previous_parent,
            subtree,
        } => listener.node_removed(doc, *node, *previous_parent, subtree),
        ChangeEvent::PropertyChanged { .. } => listener.property_changed(doc, event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(usize);

    impl ChangeListener for Counter {
        fn node_added(&mut self, _doc: &Document, _node: NodeId) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_listener_registration() {
        let mut list = ListenerList::default();
        let first = list.add(Rc::new(RefCell::new(Counter(0))));
        let second = list.add(Rc::new(RefCell::new(Counter(0))));
        assert_ne!(first, second);
        assert_eq!(list.len(), 2);
        assert!(list.remove(first));
        assert!(!list.remove(first));
        assert_eq!(list.snapshot().len(), 1);
    }
}
