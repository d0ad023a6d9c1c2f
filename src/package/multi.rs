//! Multistate and multicomponent species package (`multi`)

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

pub const PACKAGE_NAME: &str = "multi";

pub const NAMESPACE_L3V1V1: &str = "http://www.sbml.org/sbml/level3/version1/multi/version1";

pub const LIST_OF_SPECIES_TYPES: &str = "listOfSpeciesTypes";
pub const LIST_OF_OUTWARD_BINDING_SITES: &str = "listOfOutwardBindingSites";

const NAMESPACES: &[&str] = &[NAMESPACE_L3V1V1];

pub const BINDING_STATUS: &[&str] = &["bound", "unbound", "either"];

pub(crate) const SPECIES_TYPE_PROPERTIES: &[PropertySpec] =
    &[PropertySpec::new("compartment", ValueType::Text)];

pub(crate) const OUTWARD_BINDING_SITE_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("bindingStatus", ValueType::Enum(BINDING_STATUS)),
    PropertySpec::new("component", ValueType::Text),
];

pub(crate) const MULTI_SPECIES_PLUGIN_PROPERTIES: &[PropertySpec] =
    &[PropertySpec::new("speciesType", ValueType::Text)];

pub(crate) const MULTI_COMPARTMENT_PLUGIN_PROPERTIES: &[PropertySpec] =
    &[PropertySpec::new("isType", ValueType::Bool)];

#[derive(Clone, Copy, Debug, Default)]
pub struct MultiPackage;

impl Package for MultiPackage {
    fn package_name(&self) -> &'static str {
        PACKAGE_NAME
    }

    fn short_label(&self) -> &'static str {
        PACKAGE_NAME
    }

    fn is_required(&self) -> bool {
        true
    }

    fn namespaces(&self) -> &'static [&'static str] {
        NAMESPACES
    }

    fn namespace_uri(&self, level: i64, version: i64, package_version: i64) -> Option<&'static str> {
        (level == 3 && version == 1 && package_version == 1).then_some(NAMESPACE_L3V1V1)
    }

    fn create_plugin_for(&self, doc: &Document, host: NodeId) -> Option<PluginKind> {
        match doc.kind(host)? {
            ElementKind::Model => Some(PluginKind::MultiModel),
            ElementKind::Species => Some(PluginKind::MultiSpecies),
            ElementKind::Compartment => Some(PluginKind::MultiCompartment),
            ElementKind::ListOf => None,
            _ => Some(PluginKind::MultiSBase),
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
            (Owner::Plugin(PluginKind::MultiModel), "createSpeciesType") => {
                create_in_plugin_list(doc, *host, namespace, LIST_OF_SPECIES_TYPES, method)
            }
            (Owner::Plugin(PluginKind::MultiSpecies), "createOutwardBindingSite") => {
                create_in_plugin_list(doc, *host, namespace, LIST_OF_OUTWARD_BINDING_SITES, method)
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
