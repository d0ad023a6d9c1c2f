//! Dynamic structures package (`dyn`)
//!
//! Adds a `cboTerm` and the `applyToAll` flag to events, element references
//! below events and spatial components below compartments.

use indexmap::IndexMap;

use super::{
    create_in_plugin_list, extension_attribute, extension_start_element, own_elements,
    package_element_attributes, plugin_attributes, plugin_elements, target_owner, AttributeInfo,
    Context, FactoryError, FactoryTarget, Owner, Package, StartElement, ELEMENT_CHAIN,
};
use crate::error::Result;
use crate::plugin::PluginKind;
use crate::tree::{Document, ElementKind, NodeId, PropertySpec};
use crate::value::ValueType;

pub const PACKAGE_NAME: &str = "dyn";

pub const NAMESPACE_L3V1V1: &str = "http://www.sbml.org/sbml/level3/version1/dyn/version1";

pub const LIST_OF_DYN_ELEMENTS: &str = "listOfDynElements";
pub const LIST_OF_SPATIAL_COMPONENTS: &str = "listOfSpatialComponents";

const NAMESPACES: &[&str] = &[NAMESPACE_L3V1V1];

/// Values of `spatialComponent/@spatialIndex`
pub const SPATIAL_KINDS: &[&str] = &[
    "cartesianX",
    "cartesianY",
    "cartesianZ",
    "alpha",
    "beta",
    "gamma",
    "F_x",
    "F_y",
    "F_z",
];

pub(crate) const DYN_ELEMENT_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("idRef", ValueType::Text),
    PropertySpec::new("metaIdRef", ValueType::Text),
];

pub(crate) const SPATIAL_COMPONENT_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("spatialIndex", ValueType::Enum(SPATIAL_KINDS)),
    PropertySpec::new("variable", ValueType::Text),
];

pub(crate) const DYN_SBASE_PLUGIN_PROPERTIES: &[PropertySpec] =
    &[PropertySpec::new("cboTerm", ValueType::Text)];

pub(crate) const DYN_EVENT_PLUGIN_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("cboTerm", ValueType::Text),
    PropertySpec::new("applyToAll", ValueType::Bool),
];

#[derive(Clone, Copy, Debug, Default)]
pub struct DynPackage;

impl Package for DynPackage {
    fn package_name(&self) -> &'static str {
        PACKAGE_NAME
    }

    fn short_label(&self) -> &'static str {
        PACKAGE_NAME
    }

    fn is_required(&self) -> bool {
        false
    }

    fn namespaces(&self) -> &'static [&'static str] {
        NAMESPACES
    }

    fn namespace_uri(&self, level: i64, version: i64, package_version: i64) -> Option<&'static str> {
        (level == 3 && version == 1 && package_version == 1).then_some(NAMESPACE_L3V1V1)
    }

    fn create_plugin_for(&self, doc: &Document, host: NodeId) -> Option<PluginKind> {
        match doc.kind(host)? {
            ElementKind::Event => Some(PluginKind::DynEvent),
            ElementKind::Compartment => Some(PluginKind::DynCompartment),
            ElementKind::ListOf => None,
            _ => Some(PluginKind::DynSBase),
        }
    }

    fn invoke_factory(
        &self,
        doc: &mut Document,
        target: &FactoryTarget,
        method: &str,
    ) -> std::result::Result<NodeId, FactoryError> {
        let owner = target_owner(doc, target, method)?;
        let FactoryTarget::Plugin { host, namespace } = target else {
            return Err(owner.no_such_method(method));
        };
        match (owner, method) {
            (Owner::Plugin(PluginKind::DynEvent), "createDynElement") => {
                create_in_plugin_list(doc, *host, namespace, LIST_OF_DYN_ELEMENTS, method)
            }
            (Owner::Plugin(PluginKind::DynCompartment), "createSpatialComponent") => {
                create_in_plugin_list(doc, *host, namespace, LIST_OF_SPATIAL_COMPONENTS, method)
            }
            _ => Err(owner.no_such_method(method)),
        }
    }

    fn process_start_element(
        &self,
        doc: &mut Document,
        element: &StartElement<'_>,
        context: &Context,
    ) -> Context {
        extension_start_element(self, doc, element, context)
    }

    fn process_attribute(
        &self,
        doc: &mut Document,
        attribute: &AttributeInfo<'_>,
        context: &Context,
    ) -> Result<bool> {
        extension_attribute(self, ELEMENT_CHAIN, doc, attribute, context)
    }

    fn write_xml_attributes(&self, doc: &Document, node: NodeId) -> IndexMap<String, String> {
        let mut attributes = IndexMap::new();
        if doc.node(node).is_some_and(|n| self.owns(n)) {
            attributes = package_element_attributes(doc, node, PACKAGE_NAME);
        }
        if let Some((_, plugin)) = self.plugin(doc, node) {
            attributes.extend(plugin_attributes(plugin, PACKAGE_NAME));
        }
        attributes
    }

    fn elements_to_write(&self, doc: &Document, node: NodeId) -> Vec<NodeId> {
        let mut elements = Vec::new();
        if doc.node(node).is_some_and(|n| self.owns(n)) {
            elements = own_elements(doc, node);
        }
        if let Some((_, plugin)) = self.plugin(doc, node) {
            elements.extend(plugin_elements(doc, plugin));
        }
        elements
    }
}
