//! Keep a foreign tree in step with a [`Document`]
//!
//! The foreign tree is driven purely by naming convention: `create<Kind>` on
//! the counterpart of the parent, `set<Property>` / `unset<Property>` on the
//! counterpart of the node. Links between the two trees live in a side
//! table owned by the synchronizer. Anything that cannot be mirrored is
//! logged and skipped; the document stays authoritative.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::events::{ChangeEvent, ChangeListener, ListenerId, ADD_EXTENSION};
use crate::tree::{capitalize, Document, ElementKind, NodeId};
use crate::value::PropertyValue;

/// Failure reported by a foreign tree
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MirrorError {
    #[error("{owner} has no method '{method}'")]
    NoSuchMethod { method: String, owner: String },
    #[error("'{method}' does not accept a {found} value")]
    TypeMismatch { method: String, found: &'static str },
    #[error("'{method}' failed: {reason}")]
    Failed { method: String, reason: String },
    #[error("unknown mirror handle")]
    UnknownHandle,
}

/// Foreign tree honoring the `create<Kind>` / `set<Property>` convention
pub trait MirrorTree {
    type Handle: Copy + Eq + Hash + fmt::Debug;

    /// Counterpart of the document root
    fn root(&self) -> Self::Handle;

    /// Invoke zero-argument factory `method` on `parent`
    fn call_factory(&mut self, parent: Self::Handle, method: &str) -> Result<Self::Handle, MirrorError>;

    fn call_setter(
        &mut self,
        target: Self::Handle,
        method: &str,
        value: &PropertyValue,
    ) -> Result<(), MirrorError>;

    fn call_unsetter(&mut self, target: Self::Handle, method: &str) -> Result<(), MirrorError>;

    /// Detach `target` from its parent and drop it with its descendants
    fn destroy(&mut self, target: Self::Handle) -> Result<(), MirrorError>;
}

/// Change listener projecting document events onto a [`MirrorTree`]
pub struct MirrorSynchronizer<T: MirrorTree> {
    target: T,
    links: HashMap<NodeId, T::Handle>,
}

impl<T: MirrorTree + 'static> MirrorSynchronizer<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            links: HashMap::new(),
        }
    }

    /// Link the roots, mirror what `doc` already holds and subscribe
    #[instrument(level = "debug", skip_all, fields(nodes = doc.len()))]
    pub fn attach(doc: &mut Document, target: T) -> (ListenerId, Rc<RefCell<Self>>) {
        let mut synchronizer = Self::new(target);
        let root = doc.root();
        synchronizer.links.insert(root, synchronizer.target.root());
        synchronizer.transfer_properties(doc, root);
        for child in doc.all_children(root) {
            synchronizer.mirror_subtree(doc, child);
        }
        doc.subscribe(synchronizer)
    }
}

impl<T: MirrorTree> MirrorSynchronizer<T> {
    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Foreign counterpart of `node`, if mirrored
    pub fn link(&self, node: NodeId) -> Option<T::Handle> {
        self.links.get(&node).copied()
    }

    pub fn linked_count(&self) -> usize {
        self.links.len()
    }

    /// Mirror `node` and everything below it; containers pass through
    fn mirror_subtree(&mut self, doc: &Document, node: NodeId) {
        let Some(kind) = doc.kind(node) else {
            return;
        };
        if kind == ElementKind::ListOf {
            for child in doc.all_children(node) {
                self.mirror_subtree(doc, child);
            }
            return;
        }

        let Some(parent) = self.parent_link(doc, node) else {
            debug!(node = ?node, kind = %kind, "parent has no counterpart, node not mirrored");
            return;
        };
        let method = format!("create{}", kind.type_name());
        match self.target.call_factory(parent, &method) {
            Ok(handle) => {
                self.links.insert(node, handle);
                self.transfer_properties(doc, node);
                for child in doc.all_children(node) {
                    self.mirror_subtree(doc, child);
                }
            }
            Err(err) => {
                debug!(node = ?node, kind = %kind, method = %method, error = %err, "node not mirrored");
            }
        }
    }

    /// Counterpart of the nearest non-container ancestor
    fn parent_link(&self, doc: &Document, node: NodeId) -> Option<T::Handle> {
        let mut current = doc.parent(node)?;
        while doc.kind(current) == Some(ElementKind::ListOf) {
            current = doc.parent(current)?;
        }
        self.link(current)
    }

    fn transfer_properties(&mut self, doc: &Document, node: NodeId) {
        let Some(kind) = doc.kind(node) else {
            return;
        };
        for (name, value) in doc.properties(node) {
            self.apply_property(doc, node, kind.event_property_name(name), Some(&value));
        }
    }

    fn apply_property(
        &mut self,
        doc: &Document,
        node: NodeId,
        property: &str,
        new: Option<&PropertyValue>,
    ) {
        let Some(handle) = self.link(node) else {
            debug!(node = ?node, property, "node has no counterpart, property not mirrored");
            return;
        };
        let Some(kind) = doc.kind(node) else {
            return;
        };

        let (method, value) = match setter_for(doc, node, kind, property) {
            Some(method) => (method.to_string(), new.cloned()),
            None => {
                // same-named getter on the document side
                match doc.try_property(node, property) {
                    Ok(value) => (format!("set{}", capitalize(property)), value),
                    Err(err) => {
                        debug!(node = ?node, kind = %kind, property, error = %err, "no getter, property not mirrored");
                        return;
                    }
                }
            }
        };

        if let Some(stale) = cleared_sibling(kind, &method) {
            if let Err(err) = self.target.call_unsetter(handle, stale) {
                debug!(node = ?node, kind = %kind, method = stale, error = %err, "stale value not cleared");
            }
        }

        let result = match &value {
            Some(value) => self.target.call_setter(handle, &method, value),
            None => {
                let unsetter = format!("un{method}");
                self.target.call_unsetter(handle, &unsetter)
            }
        };
        if let Err(err) = result {
            debug!(
                node = ?node,
                kind = %kind,
                property,
                method = %method,
                error = %err,
                "property not mirrored"
            );
        }
    }

    fn unmirror(&mut self, doc: &Document, node: NodeId, subtree: &[NodeId]) {
        // nodes whose counterpart is gone, directly or with an ancestor
        let mut covered: HashSet<NodeId> = HashSet::new();
        for &id in subtree {
            let under_destroyed =
                id != node && doc.parent(id).is_some_and(|parent| covered.contains(&parent));
            match self.links.remove(&id) {
                Some(handle) if !under_destroyed => {
                    if let Err(err) = self.target.destroy(handle) {
                        debug!(node = ?id, error = %err, "counterpart not destroyed");
                    }
                    covered.insert(id);
                }
                Some(_) => {
                    covered.insert(id);
                }
                None if under_destroyed => {
                    covered.insert(id);
                }
                None if id == node => {
                    debug!(node = ?id, kind = ?doc.kind(id), "removed node has no counterpart");
                }
                None => {}
            }
        }
    }
}

/// Setter for `property` on `kind`, where it differs from the plain convention
fn setter_for(doc: &Document, node: NodeId, kind: ElementKind, property: &str) -> Option<&'static str> {
    let setter = match (kind, property) {
        (ElementKind::Parameter, "value") => "setValue",
        (ElementKind::Compartment, "value") => "setSize",
        (ElementKind::Species, "value") => {
            if doc.is_set(node, "initialConcentration") {
                "setInitialConcentration"
            } else {
                "setInitialAmount"
            }
        }
        (_, "metaid") => "setMetaId",
        (_, "sboTerm") => "setSBOTerm",
        (_, "id") => "setId",
        (_, "name") => "setName",
        (_, "compartment") => "setCompartment",
        (_, "constant") => "setConstant",
        (_, "units") => "setUnits",
        (_, "spatialDimensions") => "setSpatialDimensions",
        (_, "hasOnlySubstanceUnits") => "setHasOnlySubstanceUnits",
        (_, "boundaryCondition") => "setBoundaryCondition",
        (_, "useValuesFromTriggerTime") => "setUseValuesFromTriggerTime",
        (_, "variable") => "setVariable",
        (ElementKind::Sbml, "level") => "setLevel",
        (ElementKind::Sbml, "version") => "setVersion",
        _ => return None,
    };
    Some(setter)
}

/// Unsetter for the species field cleared in the document when `setter` ran
fn cleared_sibling(kind: ElementKind, setter: &str) -> Option<&'static str> {
    match (kind, setter) {
        (ElementKind::Species, "setInitialAmount") => Some("unsetInitialConcentration"),
        (ElementKind::Species, "setInitialConcentration") => Some("unsetInitialAmount"),
        _ => None,
    }
}

impl<T: MirrorTree> ChangeListener for MirrorSynchronizer<T> {
    fn node_added(&mut self, doc: &Document, node: NodeId) {
        self.mirror_subtree(doc, node);
    }

    fn node_removed(
        &mut self,
        doc: &Document,
        node: NodeId,
        _previous_parent: Option<NodeId>,
        subtree: &[NodeId],
    ) {
        self.unmirror(doc, node, subtree);
    }

    fn property_changed(&mut self, doc: &Document, event: &ChangeEvent) {
        let ChangeEvent::PropertyChanged {
            node,
            namespace,
            property,
            new,
            ..
        } = event
        else {
            return;
        };
        if property == ADD_EXTENSION {
            debug!(node = ?node, namespace = ?new, "plugins are not mirrored");
            return;
        }
        if let Some(namespace) = namespace {
            debug!(node = ?node, namespace = %namespace, property = %property, "plugin property not mirrored");
            return;
        }
        self.apply_property(doc, *node, property, new.as_ref());
    }
}

impl<T: MirrorTree + fmt::Debug> fmt::Debug for MirrorSynchronizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorSynchronizer")
            .field("target", &self.target)
            .field("links", &self.links.len())
            .finish()
    }
}
