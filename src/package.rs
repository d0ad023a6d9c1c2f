//! Package registration and the read/write dispatch protocol
//!
//! Every vocabulary (core included) implements [`Package`]. The reader picks
//! a package by the namespace of each element or attribute and lets it decide
//! what the element denotes in the current [`Context`]; the writer asks each
//! package for the attributes and children it contributes to a node.

pub mod core;
pub mod dynamic;
pub mod multi;

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::error::{Error, Result};
use crate::plugin::{Plugin, PluginKind};
use crate::tree::node::{NAMED_PROPERTIES, SBASE_PROPERTIES};
use crate::tree::{factory_method_name, CoreList, Document, ElementKind, Node, NodeId};

/// Object the reader is currently inside of
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Context {
    /// Before the root element
    Document,
    Node(NodeId),
}

/// Start tag as seen by a package
#[derive(Clone, Copy, Debug)]
pub struct StartElement<'a> {
    pub name: &'a str,
    pub namespace_uri: &'a str,
    pub has_attributes: bool,
    pub has_namespaces: bool,
}

/// Attribute as seen by a package
///
/// `namespace_uri` is the attribute's own namespace, or the element's when
/// the attribute is unprefixed.
#[derive(Clone, Copy, Debug)]
pub struct AttributeInfo<'a> {
    pub element_name: &'a str,
    pub name: &'a str,
    pub prefix: Option<&'a str>,
    pub value: &'a str,
    pub namespace_uri: &'a str,
    pub is_last: bool,
}

/// Logical owner a factory method is looked up on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FactoryTarget {
    Node(NodeId),
    /// The host's plugin for `namespace`
    Plugin { host: NodeId, namespace: String },
}

/// Failure of a factory-by-convention lookup
///
/// Logged and treated as "no such child"; never surfaced as a read error.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("{owner} has no factory method '{method}'")]
    NoSuchMethod { method: String, owner: String },
    #[error("factory method '{method}' is not accessible: {reason}")]
    Inaccessible { method: String, reason: String },
    #[error("factory method '{method}' failed: {source}")]
    Invocation {
        method: String,
        #[source]
        source: Error,
    },
}

/// One link of an attribute chain: consume `name` on `node` or pass
pub type AttributeHandler = fn(&mut Document, NodeId, &str, &str) -> Result<bool>;

/// Try each handler in order, stopping at the first that consumes the attribute
pub fn run_chain(
    chain: &[AttributeHandler],
    doc: &mut Document,
    node: NodeId,
    name: &str,
    value: &str,
) -> Result<bool> {
    for handler in chain {
        if handler(doc, node, name, value)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `metaid` and `sboTerm`, shared by every node
pub fn sbase_attribute(doc: &mut Document, node: NodeId, name: &str, value: &str) -> Result<bool> {
    if SBASE_PROPERTIES.iter().any(|spec| spec.name == name) {
        doc.set_property_from_str(node, name, value)?;
        return Ok(true);
    }
    Ok(false)
}

/// `id` and `name` on named kinds
pub fn named_attribute(doc: &mut Document, node: NodeId, name: &str, value: &str) -> Result<bool> {
    let named = doc.kind(node).is_some_and(ElementKind::is_named);
    if named && NAMED_PROPERTIES.iter().any(|spec| spec.name == name) {
        doc.set_property_from_str(node, name, value)?;
        return Ok(true);
    }
    Ok(false)
}

/// Attributes declared by the node's own kind
pub fn own_attribute(doc: &mut Document, node: NodeId, name: &str, value: &str) -> Result<bool> {
    let declared = doc
        .kind(node)
        .is_some_and(|kind| kind.own_properties().iter().any(|spec| spec.name == name));
    if declared {
        doc.set_property_from_str(node, name, value)?;
        return Ok(true);
    }
    Ok(false)
}

/// SBase, then named, then kind-specific
pub const ELEMENT_CHAIN: &[AttributeHandler] = &[sbase_attribute, named_attribute, own_attribute];

/// A vocabulary pluggable onto the document tree
pub trait Package {
    fn package_name(&self) -> &'static str;

    /// XML prefix
    fn short_label(&self) -> &'static str;

    fn is_required(&self) -> bool;

    /// Namespaces this package's reader recognizes
    fn namespaces(&self) -> &'static [&'static str];

    /// Namespace for a (level, version, package version) triple
    fn namespace_uri(&self, level: i64, version: i64, package_version: i64) -> Option<&'static str>;

    /// Plugin variant for `host`, or `None` if the host cannot carry one
    fn create_plugin_for(&self, doc: &Document, host: NodeId) -> Option<PluginKind>;

    /// Closed factory table: invoke `method` on `target`
    fn invoke_factory(
        &self,
        doc: &mut Document,
        target: &FactoryTarget,
        method: &str,
    ) -> std::result::Result<NodeId, FactoryError>;

    /// Decide what a nested element denotes; returning `context` unchanged
    /// means the element is not recognized
    fn process_start_element(
        &self,
        doc: &mut Document,
        element: &StartElement<'_>,
        context: &Context,
    ) -> Context;

    /// Consume an attribute; `Ok(false)` means unknown to the whole chain
    fn process_attribute(
        &self,
        doc: &mut Document,
        attribute: &AttributeInfo<'_>,
        context: &Context,
    ) -> Result<bool>;

    /// Attributes this package writes on `node`, keyed by qualified name
    fn write_xml_attributes(&self, doc: &Document, node: NodeId) -> IndexMap<String, String>;

    /// Children this package writes below `node`
    fn elements_to_write(&self, doc: &Document, node: NodeId) -> Vec<NodeId>;

    /// Whether `node` belongs to this package's vocabulary
    fn owns(&self, node: &Node) -> bool {
        node.package_name() == Some(self.package_name())
    }

    /// This package's plugin on `host`, under whichever namespace it was attached
    fn plugin<'d>(&self, doc: &'d Document, host: NodeId) -> Option<(&'static str, &'d Plugin)> {
        self.namespaces()
            .iter()
            .find_map(|ns| doc.extension(host, ns).map(|plugin| (*ns, plugin)))
    }
}

/// Packages known to a document
pub struct PackageRegistry {
    packages: Vec<Box<dyn Package>>,
}

impl Default for PackageRegistry {
    fn default() -> Self {
        let mut registry = Self::core_only();
        registry.register(Box::new(dynamic::DynPackage));
        registry.register(Box::new(multi::MultiPackage));
        registry
    }
}

impl PackageRegistry {
    /// Registry without extension packages
    pub fn core_only() -> Self {
        Self {
            packages: vec![Box::new(core::CorePackage)],
        }
    }

    pub fn register(&mut self, package: Box<dyn Package>) {
        self.packages.push(package);
    }

    pub fn packages(&self) -> impl Iterator<Item = &dyn Package> {
        self.packages.iter().map(|package| package.as_ref())
    }

    pub fn by_namespace(&self, namespace: &str) -> Option<&dyn Package> {
        self.packages()
            .find(|package| package.namespaces().contains(&namespace))
    }

    pub fn by_name(&self, name: &str) -> Option<&dyn Package> {
        self.packages()
            .find(|package| package.package_name() == name)
    }

    /// Package owning `node`; core when the node has no package
    pub fn for_node(&self, node: &Node) -> Option<&dyn Package> {
        self.by_name(node.package_name().unwrap_or(core::PACKAGE_NAME))
    }
}

impl fmt::Debug for PackageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.packages().map(|package| package.package_name()))
            .finish()
    }
}

/// Start-element step for a package extending core hosts
///
/// Inside a host, a nested name matching one of the plugin's containers
/// yields that container (creating plugin and container on demand). Inside
/// one of this package's containers, the child is created through the
/// factory convention.
pub(crate) fn extension_start_element(
    package: &dyn Package,
    doc: &mut Document,
    element: &StartElement<'_>,
    context: &Context,
) -> Context {
    let Context::Node(current) = *context else {
        return *context;
    };
    let Some(node) = doc.node(current) else {
        return *context;
    };

    if node.is_list() {
        if !package.owns(node) {
            return *context;
        }
        return factory_step(package, doc, current, element)
            .map_or(*context, Context::Node);
    }

    let kind = doc
        .extension(current, element.namespace_uri)
        .map(Plugin::kind)
        .or_else(|| package.create_plugin_for(doc, current));
    let Some(kind) = kind else {
        return *context;
    };
    if kind.list_item_kind(element.name).is_none() {
        return *context;
    }

    match doc.get_or_create_plugin_list(current, element.namespace_uri, element.name) {
        Ok(list) => Context::Node(list),
        Err(err) => {
            debug!(
                package = package.package_name(),
                element = element.name,
                error = %err,
                "could not create plugin container"
            );
            *context
        }
    }
}

/// Create the child named by `element` inside container `list`
///
/// The factory is looked up on the container's logical owner: the host's
/// plugin when the container belongs to one, the parent node otherwise.
/// Failures are logged and yield `None`.
pub(crate) fn factory_step(
    package: &dyn Package,
    doc: &mut Document,
    list: NodeId,
    element: &StartElement<'_>,
) -> Option<NodeId> {
    let method = factory_method_name(element.name);
    let Some(owner) = doc.parent(list) else {
        debug!(
            package = package.package_name(),
            element = element.name,
            method = %method,
            "container has no owner"
        );
        return None;
    };

    let plugin_namespace = doc
        .node(owner)
        .and_then(|node| {
            node.extensions()
                .iter()
                .find(|(_, plugin)| plugin.lists().values().any(|l| *l == list))
        })
        .map(|(namespace, _)| namespace.clone());
    let target = match plugin_namespace {
        Some(namespace) => FactoryTarget::Plugin {
            host: owner,
            namespace,
        },
        None => FactoryTarget::Node(owner),
    };

    match package.invoke_factory(doc, &target, &method) {
        Ok(child) => Some(child),
        Err(err) => {
            debug!(
                package = package.package_name(),
                element = element.name,
                owner = %doc.get(owner).map(Node::describe).unwrap_or_default(),
                method = %method,
                error = %err,
                "factory-by-convention failed, element ignored"
            );
            None
        }
    }
}

/// Attribute step for a package extending core hosts
///
/// Attributes on this package's own elements run `chain` first. Whatever the
/// chain leaves, and every attribute on a foreign host, goes to the host's
/// plugin for this package.
pub(crate) fn extension_attribute(
    package: &dyn Package,
    chain: &[AttributeHandler],
    doc: &mut Document,
    attribute: &AttributeInfo<'_>,
    context: &Context,
) -> Result<bool> {
    let Context::Node(current) = *context else {
        return Ok(false);
    };
    let Some(node) = doc.node(current) else {
        return Ok(false);
    };
    let (owned, kind, is_list) = (package.owns(node), node.kind(), node.is_list());

    if owned && run_chain(chain, doc, current, attribute.name, attribute.value)? {
        return Ok(true);
    }
    if kind == ElementKind::Sbml {
        return Ok(attribute.name == "required");
    }
    if is_list {
        return Ok(false);
    }

    let plugin_kind = doc
        .extension(current, attribute.namespace_uri)
        .map(Plugin::kind)
        .or_else(|| package.create_plugin_for(doc, current));
    if !plugin_kind.is_some_and(|kind| kind.property_spec(attribute.name).is_some()) {
        debug!(
            package = package.package_name(),
            element = attribute.element_name,
            attribute = attribute.name,
            prefix = attribute.prefix.unwrap_or_default(),
            last = attribute.is_last,
            "attribute not claimed by package"
        );
        return Ok(false);
    }
    doc.set_plugin_property_from_str(current, attribute.namespace_uri, attribute.name, attribute.value)?;
    Ok(true)
}

/// Set properties of `node` in schema order, unprefixed
pub(crate) fn element_attributes(doc: &Document, node: NodeId) -> IndexMap<String, String> {
    doc.properties(node)
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// Attributes of an element owned by an extension package
///
/// SBase attributes stay unprefixed; `id` and `name` are re-declared under
/// the package prefix and never appear under their core key.
pub(crate) fn package_element_attributes(
    doc: &Document,
    node: NodeId,
    label: &str,
) -> IndexMap<String, String> {
    let mut attributes = IndexMap::new();
    for (name, value) in doc.properties(node) {
        let key = if SBASE_PROPERTIES.iter().any(|spec| spec.name == name) {
            name.to_string()
        } else {
            format!("{label}:{name}")
        };
        attributes.insert(key, value.to_string());
    }
    attributes
}

/// Set plugin properties, prefixed
pub(crate) fn plugin_attributes(plugin: &Plugin, label: &str) -> IndexMap<String, String> {
    plugin
        .values()
        .map(|(name, value)| (format!("{label}:{name}"), value.to_string()))
        .collect()
}

/// Non-empty containers of a plugin, in creation order
pub(crate) fn plugin_elements(doc: &Document, plugin: &Plugin) -> Vec<NodeId> {
    plugin
        .lists()
        .values()
        .copied()
        .filter(|list| doc.list_len(*list) > 0)
        .collect()
}

/// Own children, skipping empty containers
pub(crate) fn own_elements(doc: &Document, node: NodeId) -> Vec<NodeId> {
    doc.children(node)
        .iter()
        .copied()
        .filter(|child| {
            doc.node(*child)
                .is_some_and(|c| !c.is_list() || !c.children().is_empty())
        })
        .collect()
}

/// Factory body: create an item of `list` on core `owner`
pub(crate) fn create_in_core_list(
    doc: &mut Document,
    owner: NodeId,
    list: CoreList,
    method: &str,
) -> std::result::Result<NodeId, FactoryError> {
    let invocation = |source| FactoryError::Invocation {
        method: method.to_string(),
        source,
    };
    let container = doc.get_or_create_list(owner, list).map_err(invocation)?;
    let item = doc.create_node(list.item_kind()).map_err(invocation)?;
    doc.list_append(container, item).map_err(invocation)?;
    Ok(item)
}

/// Factory body: create an item of plugin container `list_name`
pub(crate) fn create_in_plugin_list(
    doc: &mut Document,
    host: NodeId,
    namespace: &str,
    list_name: &str,
    method: &str,
) -> std::result::Result<NodeId, FactoryError> {
    let invocation = |source| FactoryError::Invocation {
        method: method.to_string(),
        source,
    };
    let container = doc
        .get_or_create_plugin_list(host, namespace, list_name)
        .map_err(invocation)?;
    let kind = doc
        .get(container)
        .ok()
        .and_then(Node::list)
        .map(|list| list.item_kind())
        .ok_or_else(|| FactoryError::Inaccessible {
            method: method.to_string(),
            reason: format!("{list_name} is not a container"),
        })?;
    let item = doc.create_node(kind).map_err(invocation)?;
    doc.list_append(container, item).map_err(invocation)?;
    Ok(item)
}

/// Type name of a factory target, for `NoSuchMethod` reports
pub(crate) fn target_owner(
    doc: &Document,
    target: &FactoryTarget,
    method: &str,
) -> std::result::Result<Owner, FactoryError> {
    let inaccessible = |reason: String| FactoryError::Inaccessible {
        method: method.to_string(),
        reason,
    };
    match target {
        FactoryTarget::Node(node) => doc
            .kind(*node)
            .map(Owner::Node)
            .ok_or_else(|| inaccessible("owner node no longer exists".to_string())),
        FactoryTarget::Plugin { host, namespace } => doc
            .extension(*host, namespace)
            .map(|plugin| Owner::Plugin(plugin.kind()))
            .ok_or_else(|| inaccessible(format!("no plugin for '{namespace}' on the owner"))),
    }
}

/// Resolved factory owner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Owner {
    Node(ElementKind),
    Plugin(PluginKind),
}

impl Owner {
    pub(crate) fn no_such_method(self, method: &str) -> FactoryError {
        let owner = match self {
            Self::Node(kind) => kind.type_name(),
            Self::Plugin(kind) => kind.type_name(),
        };
        FactoryError::NoSuchMethod {
            method: method.to_string(),
            owner: owner.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = PackageRegistry::default();
        assert_eq!(
            registry
                .by_namespace(dynamic::NAMESPACE_L3V1V1)
                .map(|p| p.short_label()),
            Some("dyn")
        );
        assert_eq!(
            registry
                .by_namespace(core::NAMESPACE_L3V2)
                .map(|p| p.package_name()),
            Some("core")
        );
        assert!(registry.by_namespace("urn:unknown").is_none());
        assert_eq!(format!("{registry:?}"), r#"["core", "dyn", "multi"]"#);

        let core_only = PackageRegistry::core_only();
        assert!(core_only.by_name("dyn").is_none());
    }

    #[test]
    fn test_chain_stops_at_first_match() {
        let mut doc = Document::new();
        let parameter = doc.create_node(ElementKind::Parameter).unwrap();
        assert!(run_chain(ELEMENT_CHAIN, &mut doc, parameter, "id", "k1").unwrap());
        assert!(run_chain(ELEMENT_CHAIN, &mut doc, parameter, "value", "2.5").unwrap());
        assert!(!run_chain(ELEMENT_CHAIN, &mut doc, parameter, "bogus", "x").unwrap());
        assert_eq!(doc.get(parameter).unwrap().id(), Some("k1"));

        let list = doc.create_list(CoreList::Parameters);
        assert!(!run_chain(ELEMENT_CHAIN, &mut doc, list, "id", "l").unwrap());
        assert!(run_chain(ELEMENT_CHAIN, &mut doc, list, "metaid", "l").unwrap());
    }

    #[test]
    fn test_factory_errors_name_owner() {
        let mut doc = Document::new();
        let model = doc.create_node(ElementKind::Model).unwrap();
        doc.attach_child(doc.root(), model).unwrap();

        let err = core::CorePackage
            .invoke_factory(&mut doc, &FactoryTarget::Node(model), "createWidget")
            .unwrap_err();
        assert_eq!(err.to_string(), "Model has no factory method 'createWidget'");

        let err = dynamic::DynPackage
            .invoke_factory(
                &mut doc,
                &FactoryTarget::Plugin {
                    host: model,
                    namespace: dynamic::NAMESPACE_L3V1V1.to_string(),
                },
                "createDynElement",
            )
            .unwrap_err();
        assert!(matches!(err, FactoryError::Inaccessible { .. }));
    }
}
