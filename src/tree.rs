//! Document tree: arena-backed nodes, containers, plugins and properties

pub mod list_of;
pub mod node;

pub use list_of::{CoreList, ListOf, ListType};
pub use node::{
    capitalize, factory_method_name, DefaultValue, ElementKind, Node, NodeData, NodeId,
    PropertySpec,
};

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use generational_arena::Arena;
use tracing::{instrument, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::events::{self, ChangeEvent, ChangeListener, ListenerId, ListenerList, ADD_EXTENSION};
use crate::package::{core, PackageRegistry};
use crate::plugin::{type_error, Plugin};
use crate::value::{same_value, PropertyValue};

/// An SBML document: the node arena, the package registry and the listeners
///
/// The root `sbml` node always exists. Nodes are created detached and become
/// part of the document tree once attached below the root; only mutations
/// of attached nodes are broadcast.
#[derive(Debug)]
pub struct Document {
    arena: Arena<Node>,
    root: NodeId,
    registry: Rc<PackageRegistry>,
    listeners: ListenerList,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Level 3 Version 1 document with the bundled packages
    pub fn new() -> Self {
        Self::with_registry(Rc::new(PackageRegistry::default()))
    }

    pub fn with_level_version(level: i64, version: i64) -> Self {
        let mut doc = Self::new();
        if let Some(root) = doc.arena.get_mut(doc.root.0) {
            root.values.insert("level", PropertyValue::Int(level));
            root.values.insert("version", PropertyValue::Int(version));
            root.namespace_uri = core::namespace_for(level, version)
                .unwrap_or(core::NAMESPACE_L3V1)
                .to_string();
        }
        doc
    }

    pub fn with_registry(registry: Rc<PackageRegistry>) -> Self {
        let mut arena = Arena::new();
        let mut root = Node::new(ElementKind::Sbml, core::NAMESPACE_L3V1.to_string());
        root.values.insert("level", PropertyValue::Int(3));
        root.values.insert("version", PropertyValue::Int(1));
        let root = NodeId(arena.insert(root));
        Self {
            arena,
            root,
            registry,
            listeners: ListenerList::default(),
        }
    }

    /// The `sbml` root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn registry(&self) -> &Rc<PackageRegistry> {
        &self.registry
    }

    pub fn level(&self) -> i64 {
        self.root_int("level", 3)
    }

    pub fn version(&self) -> i64 {
        self.root_int("version", 1)
    }

    fn root_int(&self, property: &str, fallback: i64) -> i64 {
        self.node(self.root)
            .and_then(|root| root.value(property))
            .and_then(PropertyValue::as_int)
            .unwrap_or(fallback)
    }

    /// Core namespace for this document's level and version
    pub fn core_namespace(&self) -> &'static str {
        core::namespace_for(self.level(), self.version()).unwrap_or(core::NAMESPACE_L3V1)
    }

    /// Number of live nodes, attached or not
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id.0)
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.node(id)
            .ok_or_else(|| Error::new(ErrorKind::NodeNotFound))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.arena
            .get_mut(id.0)
            .ok_or_else(|| Error::new(ErrorKind::NodeNotFound))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn kind(&self, id: NodeId) -> Option<ElementKind> {
        self.node(id).map(Node::kind)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Own children in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or_default()
    }

    /// Own children followed by every plugin container, in attachment order
    pub fn all_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut all = node.children.clone();
        for plugin in node.extensions.values() {
            all.extend(plugin.lists.values().copied());
        }
        all
    }

    /// Pre-order walk of `id` and everything below it, plugin containers included
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            for child in self.all_children(current).into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Whether `ancestor` lies on the parent chain of `id` (or is `id`)
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Whether `id` is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_ancestor(self.root, id)
    }

    /// Qualified element name, package prefix included
    pub fn qualified_name(&self, id: NodeId) -> String {
        let Some(node) = self.node(id) else {
            return String::new();
        };
        match node
            .package_name()
            .and_then(|name| self.registry.by_name(name))
        {
            Some(package) => format!("{}:{}", package.short_label(), node.element_name),
            None => node.element_name.clone(),
        }
    }

    // -- construction ------------------------------------------------------

    /// Create a detached element of `kind`
    pub fn create_node(&mut self, kind: ElementKind) -> Result<NodeId> {
        if kind == ElementKind::ListOf {
            return Err(Error::new(ErrorKind::KindMismatch {
                expected: "element".to_string(),
                found: kind.type_name().to_string(),
            }));
        }
        let namespace = self.namespace_for_package(kind.package_name());
        Ok(NodeId(self.arena.insert(Node::new(kind, namespace))))
    }

    /// Create a detached element with its `id` set
    pub fn create_with_id(&mut self, kind: ElementKind, id: &str) -> Result<NodeId> {
        let node = self.create_node(kind)?;
        self.set_property(node, "id", id)?;
        Ok(node)
    }

    /// Create a detached core container
    pub fn create_list(&mut self, list: CoreList) -> NodeId {
        let namespace = self.core_namespace().to_string();
        NodeId(self.arena.insert(Node::new_list(ListOf::core(list), namespace)))
    }

    fn namespace_for_package(&self, package: Option<&str>) -> String {
        match package {
            None => self.core_namespace().to_string(),
            Some(name) => self
                .registry
                .by_name(name)
                .and_then(|package| package.namespace_uri(self.level(), self.version(), 1))
                .unwrap_or_default()
                .to_string(),
        }
    }

    // -- structure ---------------------------------------------------------

    /// Append `child` to `parent`
    ///
    /// `child` must be detached. Fires `Added` for `child` only.
    #[instrument(level = "trace", skip(self))]
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let index = self.get(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    /// Insert `child` into `parent`'s own children at `index`
    #[instrument(level = "trace", skip(self))]
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check_attach(parent, child)?;
        let len = self.get(parent)?.children.len();
        if index > len {
            return Err(Error::new(ErrorKind::IndexOutOfBounds { index, len }));
        }

        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.insert(index, child);
        self.notify_added(child);
        Ok(())
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.get(parent)?;
        let child_node = self.get(child)?;
        if child_node.parent.is_some() {
            return Err(Error::new(ErrorKind::AlreadyHasParent {
                element: child_node.describe(),
            }));
        }
        if child == self.root || self.is_ancestor(child, parent) {
            return Err(Error::new(ErrorKind::HierarchyRequest));
        }
        if let Some(list) = parent_node.list() {
            if list.item_kind != child_node.kind {
                return Err(Error::new(ErrorKind::KindMismatch {
                    expected: list.item_kind.type_name().to_string(),
                    found: child_node.kind.type_name().to_string(),
                }));
            }
        }
        Ok(())
    }

    /// Unlink `id` from its parent, keeping the subtree alive
    ///
    /// `Removed` fires before the parent link is cleared. Detaching a
    /// detached node is a no-op.
    #[instrument(level = "trace", skip(self))]
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(());
        };

        if self.is_attached(id) && !self.listeners.is_empty() {
            let subtree = self.subtree(id);
            self.fire(&ChangeEvent::Removed {
                node: id,
                previous_parent: Some(parent),
                subtree,
            });
        }

        let parent_node = self.get_mut(parent)?;
        if let Some(position) = parent_node.children.iter().position(|c| *c == id) {
            parent_node.children.remove(position);
        } else {
            for plugin in parent_node.extensions.values_mut() {
                plugin.lists.retain(|_, list| *list != id);
            }
        }
        self.get_mut(id)?.parent = None;
        Ok(())
    }

    /// Detach `id` and free its whole subtree
    #[instrument(level = "trace", skip(self))]
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(Error::new(ErrorKind::HierarchyRequest));
        }
        self.detach(id)?;
        for node in self.subtree(id) {
            self.arena.remove(node.0);
        }
        Ok(())
    }

    // -- containers --------------------------------------------------------

    /// Existing core container of `host`
    pub fn core_list(&self, host: NodeId, list: CoreList) -> Option<NodeId> {
        self.children(host).iter().copied().find(|child| {
            self.node(*child)
                .and_then(Node::list)
                .is_some_and(|l| l.list_type == ListType::Core(list))
        })
    }

    /// Core container of `host`, created in schema position on first use
    pub fn get_or_create_list(&mut self, host: NodeId, list: CoreList) -> Result<NodeId> {
        let host_kind = self.get(host)?.kind;
        let Some(rank) = host_kind.core_lists().iter().position(|l| *l == list) else {
            return Err(Error::new(ErrorKind::KindMismatch {
                expected: format!("owner of {}", list.element_name()),
                found: host_kind.type_name().to_string(),
            }));
        };
        if let Some(existing) = self.core_list(host, list) {
            return Ok(existing);
        }

        let index = self
            .children(host)
            .iter()
            .position(|child| {
                self.node(*child)
                    .and_then(Node::list)
                    .and_then(|l| match &l.list_type {
                        ListType::Core(other) => {
                            host_kind.core_lists().iter().position(|c| c == other)
                        }
                        ListType::Other(_) => None,
                    })
                    .is_some_and(|other_rank| other_rank > rank)
            })
            .unwrap_or(self.children(host).len());

        let container = self.create_list(list);
        self.insert_child(host, index, container)?;
        Ok(container)
    }

    pub fn list_len(&self, list: NodeId) -> usize {
        self.children(list).len()
    }

    pub fn list_get(&self, list: NodeId, index: usize) -> Option<NodeId> {
        self.children(list).get(index).copied()
    }

    /// First item whose `id` equals `id`
    pub fn list_find_by_id(&self, list: NodeId, id: &str) -> Option<NodeId> {
        self.children(list)
            .iter()
            .copied()
            .find(|item| self.node(*item).and_then(Node::id) == Some(id))
    }

    pub fn list_append(&mut self, list: NodeId, item: NodeId) -> Result<()> {
        self.require_list(list)?;
        self.attach_child(list, item)
    }

    pub fn list_insert(&mut self, list: NodeId, index: usize, item: NodeId) -> Result<()> {
        self.require_list(list)?;
        self.insert_child(list, index, item)
    }

    /// Detach and return the item at `index`
    pub fn list_remove_at(&mut self, list: NodeId, index: usize) -> Result<NodeId> {
        self.require_list(list)?;
        let len = self.list_len(list);
        let item = self
            .list_get(list, index)
            .ok_or_else(|| Error::new(ErrorKind::IndexOutOfBounds { index, len }))?;
        self.detach(item)?;
        Ok(item)
    }

    /// Detach and return the first item with the given `id`
    pub fn list_remove_by_id(&mut self, list: NodeId, id: &str) -> Result<Option<NodeId>> {
        self.require_list(list)?;
        match self.list_find_by_id(list, id) {
            Some(item) => {
                self.detach(item)?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    fn require_list(&self, list: NodeId) -> Result<()> {
        let node = self.get(list)?;
        if node.is_list() {
            Ok(())
        } else {
            Err(Error::new(ErrorKind::KindMismatch {
                expected: ElementKind::ListOf.type_name().to_string(),
                found: node.kind.type_name().to_string(),
            }))
        }
    }

    // -- plugins -----------------------------------------------------------

    pub fn extension(&self, host: NodeId, namespace: &str) -> Option<&Plugin> {
        self.node(host).and_then(|node| node.extensions.get(namespace))
    }

    /// Plugin of `host` for `namespace`, created on first access
    #[instrument(level = "trace", skip(self))]
    pub fn get_or_create_extension(&mut self, host: NodeId, namespace: &str) -> Result<&Plugin> {
        let node = self.get(host)?;
        if node.is_list() {
            return Err(Error::new(ErrorKind::NotAHost {
                element: node.describe(),
            }));
        }

        if !node.extensions.contains_key(namespace) {
            let registry = Rc::clone(&self.registry);
            let package = registry.by_namespace(namespace).ok_or_else(|| {
                Error::new(ErrorKind::UnknownPackage {
                    namespace: namespace.to_string(),
                })
            })?;
            let kind = package.create_plugin_for(self, host).ok_or_else(|| {
                Error::new(ErrorKind::NotAHost {
                    element: self.get(host).map(Node::describe).unwrap_or_default(),
                })
            })?;
            let mut plugin = Plugin::new(kind);
            plugin.namespace = namespace.to_string();
            self.get_mut(host)?
                .extensions
                .insert(namespace.to_string(), plugin);
            self.fire_property(
                host,
                None,
                ADD_EXTENSION,
                None,
                Some(PropertyValue::from(namespace)),
            );
        }

        self.extension(host, namespace)
            .ok_or_else(|| Error::new(ErrorKind::NodeNotFound))
    }

    /// Attach `plugin` under `namespace`, replacing any prior plugin
    ///
    /// The plugin must be the variant the namespace's package creates for
    /// this host. The prior plugin's containers are removed with their
    /// contents; the prior plugin is returned.
    #[instrument(level = "trace", skip(self, plugin))]
    pub fn add_extension(
        &mut self,
        host: NodeId,
        namespace: &str,
        mut plugin: Plugin,
    ) -> Result<Option<Plugin>> {
        let node = self.get(host)?;
        if node.is_list() {
            return Err(Error::new(ErrorKind::NotAHost {
                element: node.describe(),
            }));
        }

        let registry = Rc::clone(&self.registry);
        let package = registry.by_namespace(namespace).ok_or_else(|| {
            Error::new(ErrorKind::UnknownPackage {
                namespace: namespace.to_string(),
            })
        })?;
        let expected = package.create_plugin_for(self, host).ok_or_else(|| {
            Error::new(ErrorKind::NotAHost {
                element: self.get(host).map(Node::describe).unwrap_or_default(),
            })
        })?;
        if expected != plugin.kind() {
            return Err(Error::new(ErrorKind::PluginMismatch {
                namespace: namespace.to_string(),
                expected: expected.type_name().to_string(),
                found: plugin.kind().type_name().to_string(),
            }));
        }
        let node = self.get(host)?;

        let stale: Vec<NodeId> = node
            .extensions
            .get(namespace)
            .map(|old| old.lists.values().copied().collect())
            .unwrap_or_default();
        for list in stale {
            self.remove(list)?;
        }

        plugin.namespace = namespace.to_string();
        plugin.lists.clear();
        let previous = self
            .get_mut(host)?
            .extensions
            .insert(namespace.to_string(), plugin);

        self.fire_property(
            host,
            None,
            ADD_EXTENSION,
            previous.as_ref().map(|p| PropertyValue::from(p.namespace())),
            Some(PropertyValue::from(namespace)),
        );
        Ok(previous)
    }

    pub fn plugin_list(&self, host: NodeId, namespace: &str, name: &str) -> Option<NodeId> {
        self.extension(host, namespace)
            .and_then(|plugin| plugin.list(name))
    }

    /// Container `name` of the plugin, creating plugin and container as needed
    ///
    /// The container carries the plugin's package with version -1 and has the
    /// host as its parent.
    #[instrument(level = "trace", skip(self))]
    pub fn get_or_create_plugin_list(
        &mut self,
        host: NodeId,
        namespace: &str,
        name: &str,
    ) -> Result<NodeId> {
        let plugin = self.get_or_create_extension(host, namespace)?;
        if let Some(existing) = plugin.list(name) {
            return Ok(existing);
        }
        let item_kind = plugin.kind.list_item_kind(name).ok_or_else(|| {
            Error::new(ErrorKind::UnknownContainer {
                name: name.to_string(),
                owner: plugin.kind.type_name().to_string(),
            })
        })?;
        let package_name = plugin.package_name.clone();

        let mut node = Node::new_list(ListOf::other(name, item_kind), namespace.to_string());
        node.package_name = Some(package_name);
        node.package_version = -1;
        node.parent = Some(host);
        let container = NodeId(self.arena.insert(node));

        if let Some(plugin) = self.get_mut(host)?.extensions.get_mut(namespace) {
            plugin.lists.insert(name.to_string(), container);
        }
        self.notify_added(container);
        Ok(container)
    }

    pub fn plugin_property(&self, host: NodeId, namespace: &str, name: &str) -> Result<PropertyValue> {
        let node = self.get(host)?;
        let Some(plugin) = node.extensions.get(namespace) else {
            return Err(Error::new(ErrorKind::PropertyNotSet {
                property: name.to_string(),
                element: node.element_name.clone(),
                id: node.id().map(str::to_string),
            }));
        };
        let spec = plugin.spec(name)?;
        if let Some(value) = plugin.values.get(spec.name) {
            return Ok(value.clone());
        }
        spec.default.map(PropertyValue::from).ok_or_else(|| {
            Error::new(ErrorKind::PropertyNotSet {
                property: name.to_string(),
                element: plugin.kind.type_name().to_string(),
                id: node.id().map(str::to_string),
            })
        })
    }

    pub fn try_plugin_property(
        &self,
        host: NodeId,
        namespace: &str,
        name: &str,
    ) -> Result<Option<PropertyValue>> {
        match self.get(host)?.extensions.get(namespace) {
            Some(plugin) => {
                let spec = plugin.spec(name)?;
                Ok(plugin.values.get(spec.name).cloned())
            }
            None => Ok(None),
        }
    }

    pub fn set_plugin_property(
        &mut self,
        host: NodeId,
        namespace: &str,
        name: &str,
        value: impl Into<PropertyValue>,
    ) -> Result<()> {
        self.put_plugin_property(host, namespace, name, Some(value.into()))
    }

    pub fn unset_plugin_property(&mut self, host: NodeId, namespace: &str, name: &str) -> Result<()> {
        self.put_plugin_property(host, namespace, name, None)
    }

    /// Parse `raw` by the property's declared type and set it
    pub(crate) fn set_plugin_property_from_str(
        &mut self,
        host: NodeId,
        namespace: &str,
        name: &str,
        raw: &str,
    ) -> Result<()> {
        let plugin = self.get_or_create_extension(host, namespace)?;
        let spec = plugin.spec(name)?;
        let value = spec.ty.parse(raw, name, &self.get(host)?.element_name)?;
        self.put_plugin_property(host, namespace, name, Some(value))
    }

    fn put_plugin_property(
        &mut self,
        host: NodeId,
        namespace: &str,
        name: &str,
        value: Option<PropertyValue>,
    ) -> Result<()> {
        self.get_or_create_extension(host, namespace)?;
        let element_name = self.get(host)?.element_name.clone();
        let plugin = self
            .get_mut(host)?
            .extensions
            .get_mut(namespace)
            .ok_or_else(|| Error::new(ErrorKind::NodeNotFound))?;
        let spec = plugin.spec(name)?;
        if let Some(value) = &value {
            if !spec.ty.accepts(value) {
                return Err(type_error(spec, value, &element_name));
            }
        }
        if same_value(plugin.values.get(spec.name), value.as_ref()) {
            return Ok(());
        }
        let old = plugin.set_value(spec.name, value.clone())?;
        self.fire_property(host, Some(namespace), spec.name, old, value);
        Ok(())
    }

    // -- properties --------------------------------------------------------

    /// Value of `name`, falling back to its default
    ///
    /// Fails with `PropertyNotSet` when the property was never set and has
    /// no default.
    pub fn property(&self, id: NodeId, name: &str) -> Result<PropertyValue> {
        let node = self.get(id)?;
        let spec = property_spec(node, name)?;
        if let Some(value) = node.values.get(spec.name) {
            return Ok(value.clone());
        }
        spec.default.map(PropertyValue::from).ok_or_else(|| {
            Error::new(ErrorKind::PropertyNotSet {
                property: name.to_string(),
                element: node.element_name.clone(),
                id: node.id().map(str::to_string),
            })
        })
    }

    /// Explicitly set value of `name`, ignoring defaults
    pub fn try_property(&self, id: NodeId, name: &str) -> Result<Option<PropertyValue>> {
        let node = self.get(id)?;
        let spec = property_spec(node, name)?;
        Ok(node.values.get(spec.name).cloned())
    }

    pub fn is_set(&self, id: NodeId, name: &str) -> bool {
        self.node(id)
            .is_some_and(|node| node.values.contains_key(name))
    }

    /// Explicitly set properties in schema order
    pub fn properties(&self, id: NodeId) -> Vec<(&'static str, PropertyValue)> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        node.kind
            .properties()
            .filter_map(|spec| {
                node.values
                    .get(spec.name)
                    .map(|value| (spec.name, value.clone()))
            })
            .collect()
    }

    /// Set a property; fires `PropertyChanged` only when the value changes
    pub fn set_property(&mut self, id: NodeId, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        self.put_property(id, name, Some(value.into()))
    }

    pub fn unset_property(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.put_property(id, name, None)
    }

    /// Parse `raw` by the property's declared type and set it
    pub(crate) fn set_property_from_str(&mut self, id: NodeId, name: &str, raw: &str) -> Result<()> {
        let node = self.get(id)?;
        let spec = property_spec(node, name)?;
        let value = spec.ty.parse(raw, name, &node.element_name)?;
        self.put_property(id, spec.name, Some(value))
    }

    fn put_property(&mut self, id: NodeId, name: &str, value: Option<PropertyValue>) -> Result<()> {
        let node = self.get(id)?;
        let kind = node.kind;
        let spec = property_spec(node, name)?;
        if let Some(value) = &value {
            if !spec.ty.accepts(value) {
                return Err(type_error(spec, value, &node.element_name));
            }
        }

        // initialAmount and initialConcentration share one symbol value
        let sibling = match (kind, spec.name) {
            (ElementKind::Species, "initialAmount") => Some("initialConcentration"),
            (ElementKind::Species, "initialConcentration") => Some("initialAmount"),
            _ => None,
        };

        let old = match sibling {
            Some(sibling) => {
                let current = node.values.get(spec.name);
                if current.is_none() && value.is_none() {
                    return Ok(());
                }
                if current.is_some() && same_value(current, value.as_ref()) {
                    return Ok(());
                }
                current.or_else(|| node.values.get(sibling)).cloned()
            }
            None => {
                let current = node.values.get(spec.name);
                if same_value(current, value.as_ref()) {
                    return Ok(());
                }
                current.cloned()
            }
        };

        let values = &mut self.get_mut(id)?.values;
        if let Some(sibling) = sibling {
            if value.is_some() {
                values.shift_remove(sibling);
            }
        }
        match &value {
            Some(value) => {
                values.insert(spec.name, value.clone());
            }
            None => {
                values.shift_remove(spec.name);
            }
        }

        if id == self.root && matches!(spec.name, "level" | "version") {
            let namespace = self.core_namespace().to_string();
            self.get_mut(id)?.namespace_uri = namespace;
        }

        self.fire_property(id, None, kind.event_property_name(spec.name), old, value);
        Ok(())
    }

    // -- listeners ---------------------------------------------------------

    pub fn add_listener(&mut self, listener: Rc<RefCell<dyn ChangeListener>>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Register `listener` and keep a typed handle to it
    pub fn subscribe<L: ChangeListener + 'static>(&mut self, listener: L) -> (ListenerId, Rc<RefCell<L>>) {
        let shared = Rc::new(RefCell::new(listener));
        let erased: Rc<RefCell<dyn ChangeListener>> = shared.clone();
        let id = self.listeners.add(erased);
        (id, shared)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn notify_added(&self, id: NodeId) {
        if !self.listeners.is_empty() && self.is_attached(id) {
            self.fire(&ChangeEvent::Added { node: id });
        }
    }

    fn fire_property(
        &self,
        id: NodeId,
        namespace: Option<&str>,
        property: &str,
        old: Option<PropertyValue>,
        new: Option<PropertyValue>,
    ) {
        if self.listeners.is_empty() || !self.is_attached(id) {
            return;
        }
        self.fire(&ChangeEvent::PropertyChanged {
            node: id,
            namespace: namespace.map(str::to_string),
            property: property.to_string(),
            old,
            new,
        });
    }

    fn fire(&self, event: &ChangeEvent) {
        for listener in self.listeners.snapshot() {
            match listener.try_borrow_mut() {
                Ok(mut listener) => events::dispatch(&mut *listener, self, event),
                Err(_) => warn!(node = ?event.node(), "listener is busy, event not delivered"),
            }
        }
    }

    // -- display -----------------------------------------------------------

    /// Indented outline of the tree: node kinds, ids, containers and plugins
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_node(&mut out, self.root, 0);
        out
    }

    fn outline_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let Some(node) = self.node(id) else {
            return;
        };
        let pad = "  ".repeat(depth);
        let _ = write!(out, "{pad}{}", self.qualified_name(id));
        if let Some(node_id) = node.id() {
            let _ = write!(out, " id={node_id}");
        }
        if node.is_list() {
            let _ = write!(out, " ({} items)", node.children.len());
        }
        out.push('\n');

        for plugin in node.extensions.values() {
            let _ = write!(out, "{pad}  [{}]", plugin.kind.type_name());
            for (name, value) in plugin.values() {
                let _ = write!(out, " {name}={value}");
            }
            out.push('\n');
        }
        for child in self.all_children(id) {
            self.outline_node(out, child, depth + 1);
        }
    }
}

fn property_spec(node: &Node, name: &str) -> Result<&'static PropertySpec> {
    node.kind.property_spec(name).ok_or_else(|| {
        Error::new(ErrorKind::UnknownProperty {
            property: name.to_string(),
            element: node.element_name.clone(),
        })
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::package::dynamic;
    use crate::test_utils::RecordingListener;

    fn model(doc: &mut Document) -> NodeId {
        let model = doc.create_with_id(ElementKind::Model, "m").unwrap();
        doc.attach_child(doc.root(), model).unwrap();
        model
    }

    #[test]
    fn test_new_document_has_root() {
        let doc = Document::new();
        assert_eq!(doc.kind(doc.root()), Some(ElementKind::Sbml));
        assert_eq!(doc.level(), 3);
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.core_namespace(), core::NAMESPACE_L3V1);
    }

    #[test]
    fn test_attach_requires_detached_child() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let other = doc.create_node(ElementKind::Model).unwrap();
        let err = doc.attach_child(other, model).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyHasParent { .. }));

        doc.detach(model).unwrap();
        doc.attach_child(other, model).unwrap();
        assert_eq!(doc.parent(model), Some(other));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn test_attach_under_descendant_rejected() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let list = doc.get_or_create_list(model, CoreList::Events).unwrap();
        let event = doc.create_node(ElementKind::Event).unwrap();
        doc.attach_child(list, event).unwrap();
        doc.detach(model).unwrap();

        let inner = doc.get_or_create_list(event, CoreList::EventAssignments).unwrap();
        let err = doc.attach_child(inner, model).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::HierarchyRequest);
    }

    #[test]
    fn test_container_is_homogeneous() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let list = doc.get_or_create_list(model, CoreList::Species).unwrap();
        let parameter = doc.create_node(ElementKind::Parameter).unwrap();
        let err = doc.list_append(list, parameter).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::KindMismatch {
                expected: "Species".to_string(),
                found: "Parameter".to_string(),
            }
        );
    }

    #[test]
    fn test_core_lists_kept_in_schema_order() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let events = doc.get_or_create_list(model, CoreList::Events).unwrap();
        let compartments = doc.get_or_create_list(model, CoreList::Compartments).unwrap();
        let parameters = doc.get_or_create_list(model, CoreList::Parameters).unwrap();
        assert_eq!(doc.children(model), &[compartments, parameters, events]);
        assert_eq!(
            doc.get_or_create_list(model, CoreList::Events).unwrap(),
            events
        );
    }

    #[test]
    fn test_list_lookup_and_removal() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let list = doc.get_or_create_list(model, CoreList::Parameters).unwrap();
        for id in ["k1", "k2", "k3"] {
            let p = doc.create_with_id(ElementKind::Parameter, id).unwrap();
            doc.list_append(list, p).unwrap();
        }
        let first = doc.create_with_id(ElementKind::Parameter, "k0").unwrap();
        doc.list_insert(list, 0, first).unwrap();

        assert_eq!(doc.list_len(list), 4);
        assert_eq!(doc.list_get(list, 0), Some(first));
        let k2 = doc.list_find_by_id(list, "k2").unwrap();
        assert_eq!(doc.list_remove_by_id(list, "k2").unwrap(), Some(k2));
        assert_eq!(doc.parent(k2), None);
        assert_eq!(doc.list_remove_by_id(list, "missing").unwrap(), None);

        let removed = doc.list_remove_at(list, 2).unwrap();
        assert_eq!(doc.get(removed).unwrap().id(), Some("k3"));
        let err = doc.list_remove_at(list, 5).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::IndexOutOfBounds { index: 5, len: 2 });
    }

    #[test]
    fn test_remove_frees_subtree() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let list = doc.get_or_create_list(model, CoreList::Events).unwrap();
        let event = doc.create_node(ElementKind::Event).unwrap();
        doc.list_append(list, event).unwrap();
        let dyn_list = doc
            .get_or_create_plugin_list(event, dynamic::NAMESPACE_L3V1V1, "listOfDynElements")
            .unwrap();

        doc.remove(model).unwrap();
        for node in [model, list, event, dyn_list] {
            assert!(!doc.contains(node));
        }
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.remove(doc.root()).unwrap_err().kind(), &ErrorKind::HierarchyRequest);
    }

    #[test]
    fn test_property_defaults_and_not_set() {
        let mut doc = Document::new();
        let compartment = doc.create_with_id(ElementKind::Compartment, "cell").unwrap();
        assert_eq!(
            doc.property(compartment, "spatialDimensions").unwrap(),
            PropertyValue::Double(3.0)
        );
        assert_eq!(doc.try_property(compartment, "spatialDimensions").unwrap(), None);

        let err = doc.property(compartment, "size").unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::PropertyNotSet {
                property: "size".to_string(),
                element: "compartment".to_string(),
                id: Some("cell".to_string()),
            }
        );

        let err = doc.property(compartment, "bogus").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownProperty { .. }));
        let err = doc.set_property(compartment, "size", "big").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn test_species_amount_and_concentration_exclusive() {
        let mut doc = Document::new();
        let species = doc.create_node(ElementKind::Species).unwrap();
        doc.set_property(species, "initialConcentration", 2.0).unwrap();
        doc.set_property(species, "initialAmount", 5.0).unwrap();
        assert!(!doc.is_set(species, "initialConcentration"));
        assert_eq!(
            doc.property(species, "initialAmount").unwrap(),
            PropertyValue::Double(5.0)
        );
        // unsetting the inactive one leaves the value alone
        doc.unset_property(species, "initialConcentration").unwrap();
        assert!(doc.is_set(species, "initialAmount"));
    }

    #[test]
    fn test_no_op_set_is_silent() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let (_, recorder) = doc.subscribe(RecordingListener::default());

        doc.set_property(model, "name", "first").unwrap();
        doc.set_property(model, "name", "first").unwrap();
        doc.unset_property(model, "metaid").unwrap();
        assert_eq!(recorder.borrow().events.len(), 1);
    }

    #[test]
    fn test_detached_nodes_are_silent_until_attached() {
        let mut doc = Document::new();
        let (_, recorder) = doc.subscribe(RecordingListener::default());
        let model = doc.create_node(ElementKind::Model).unwrap();
        doc.set_property(model, "id", "m").unwrap();
        assert!(recorder.borrow().events.is_empty());

        doc.attach_child(doc.root(), model).unwrap();
        assert_eq!(
            recorder.borrow().events,
            vec![ChangeEvent::Added { node: model }]
        );
    }

    #[test]
    fn test_outline_lists_plugins_and_containers() {
        let mut doc = Document::new();
        let model = model(&mut doc);
        let list = doc.get_or_create_list(model, CoreList::Events).unwrap();
        let event = doc.create_with_id(ElementKind::Event, "e1").unwrap();
        doc.list_append(list, event).unwrap();
        doc.set_plugin_property(event, dynamic::NAMESPACE_L3V1V1, "applyToAll", true)
            .unwrap();

        let outline = doc.outline();
        assert!(outline.contains("sbml\n"));
        assert!(outline.contains("    listOfEvents (1 items)\n"));
        assert!(outline.contains("[DynEventPlugin] applyToAll=true"));
    }
}
