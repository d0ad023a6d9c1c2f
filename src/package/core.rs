//! SBML core vocabulary

use indexmap::IndexMap;
use tracing::debug;

use super::{
    create_in_core_list, element_attributes, factory_step, own_elements, run_chain, target_owner,
    AttributeInfo, Context, FactoryError, FactoryTarget, Owner, Package, StartElement,
    ELEMENT_CHAIN,
};
use crate::error::Result;
use crate::plugin::PluginKind;
use crate::tree::{CoreList, Document, ElementKind, Node, NodeId};

pub const PACKAGE_NAME: &str = "core";

pub const NAMESPACE_L3V1: &str = "http://www.sbml.org/sbml/level3/version1/core";
pub const NAMESPACE_L3V2: &str = "http://www.sbml.org/sbml/level3/version2/core";
pub const NAMESPACE_L2V4: &str = "http://www.sbml.org/sbml/level2/version4";

const NAMESPACES: &[&str] = &[NAMESPACE_L3V1, NAMESPACE_L3V2, NAMESPACE_L2V4];

/// Core namespace of a level/version pair
pub fn namespace_for(level: i64, version: i64) -> Option<&'static str> {
    match (level, version) {
        (3, 1) => Some(NAMESPACE_L3V1),
        (3, 2) => Some(NAMESPACE_L3V2),
        (2, 4) => Some(NAMESPACE_L2V4),
        _ => None,
    }
}

/// Level/version pair of a core namespace
pub fn level_version(namespace: &str) -> Option<(i64, i64)> {
    match namespace {
        NAMESPACE_L3V1 => Some((3, 1)),
        NAMESPACE_L3V2 => Some((3, 2)),
        NAMESPACE_L2V4 => Some((2, 4)),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CorePackage;

impl Package for CorePackage {
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

    fn namespace_uri(&self, level: i64, version: i64, _package_version: i64) -> Option<&'static str> {
        namespace_for(level, version)
    }

    fn create_plugin_for(&self, _doc: &Document, _host: NodeId) -> Option<PluginKind> {
        None
    }

    fn invoke_factory(
        &self,
        doc: &mut Document,
        target: &FactoryTarget,
        method: &str,
    ) -> std::result::Result<NodeId, FactoryError> {
        let owner = target_owner(doc, target, method)?;
        let (Owner::Node(kind), FactoryTarget::Node(host)) = (owner, target) else {
            return Err(owner.no_such_method(method));
        };
        let host = *host;

        match (kind, method) {
            (ElementKind::Sbml, "createModel") => {
                let invocation = |source| FactoryError::Invocation {
                    method: method.to_string(),
                    source,
                };
                let model = doc.create_node(ElementKind::Model).map_err(invocation)?;
                doc.attach_child(host, model).map_err(invocation)?;
                Ok(model)
            }
            (ElementKind::Model, "createCompartment") => {
                create_in_core_list(doc, host, CoreList::Compartments, method)
            }
            (ElementKind::Model, "createSpecies") => {
                create_in_core_list(doc, host, CoreList::Species, method)
            }
            (ElementKind::Model, "createParameter") => {
                create_in_core_list(doc, host, CoreList::Parameters, method)
            }
            (ElementKind::Model, "createEvent") => {
                create_in_core_list(doc, host, CoreList::Events, method)
            }
            (ElementKind::Event, "createEventAssignment") => {
                create_in_core_list(doc, host, CoreList::EventAssignments, method)
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
        let current = match *context {
            Context::Document => {
                if element.name != "sbml" {
                    return *context;
                }
                let root = doc.root();
                debug!(
                    namespace = element.namespace_uri,
                    has_attributes = element.has_attributes,
                    has_namespaces = element.has_namespaces,
                    "document root"
                );
                if let Some((level, version)) = level_version(element.namespace_uri) {
                    let applied = doc
                        .set_property(root, "level", level)
                        .and_then(|()| doc.set_property(root, "version", version));
                    if let Err(err) = applied {
                        debug!(error = %err, "could not apply level and version");
                    }
                }
                return Context::Node(root);
            }
            Context::Node(current) => current,
        };

        let Some(node) = doc.node(current) else {
            return *context;
        };
        if node.is_list() {
            if !self.owns(node) {
                return *context;
            }
            return factory_step(self, doc, current, element).map_or(*context, Context::Node);
        }

        let kind = node.kind();
        if kind == ElementKind::Sbml && element.name == "model" {
            return match self.invoke_factory(doc, &FactoryTarget::Node(current), "createModel") {
                Ok(model) => Context::Node(model),
                Err(err) => {
                    debug!(error = %err, "model not created");
                    *context
                }
            };
        }

        let Some(list) = CoreList::from_element_name(element.name)
            .filter(|list| kind.core_lists().contains(list))
        else {
            return *context;
        };
        match doc.get_or_create_list(current, list) {
            Ok(container) => Context::Node(container),
            Err(err) => {
                debug!(element = element.name, error = %err, "container not created");
                *context
            }
        }
    }

    fn process_attribute(
        &self,
        doc: &mut Document,
        attribute: &AttributeInfo<'_>,
        context: &Context,
    ) -> Result<bool> {
        let Context::Node(current) = *context else {
            return Ok(false);
        };
        if !doc.node(current).is_some_and(|node| self.owns(node)) {
            return Ok(false);
        }
        let consumed = run_chain(ELEMENT_CHAIN, doc, current, attribute.name, attribute.value)?;
        if !consumed {
            debug!(
                element = attribute.element_name,
                attribute = attribute.name,
                prefix = attribute.prefix.unwrap_or_default(),
                last = attribute.is_last,
                "attribute not claimed by core"
            );
        }
        Ok(consumed)
    }

    fn write_xml_attributes(&self, doc: &Document, node: NodeId) -> IndexMap<String, String> {
        element_attributes(doc, node)
    }

    fn elements_to_write(&self, doc: &Document, node: NodeId) -> Vec<NodeId> {
        own_elements(doc, node)
    }

    fn owns(&self, node: &Node) -> bool {
        node.package_name().is_none()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::value::PropertyValue;

    fn start(name: &str) -> StartElement<'_> {
        StartElement {
            name,
            namespace_uri: NAMESPACE_L3V1,
            has_attributes: false,
            has_namespaces: false,
        }
    }

    #[test]
    fn test_namespace_table() {
        assert_eq!(namespace_for(3, 2), Some(NAMESPACE_L3V2));
        assert_eq!(namespace_for(1, 1), None);
        assert_eq!(level_version(NAMESPACE_L2V4), Some((2, 4)));
        assert_eq!(level_version("urn:other"), None);
    }

    #[test]
    fn test_start_elements_build_tree() {
        let mut doc = Document::new();
        let package = CorePackage;

        let root = package.process_start_element(&mut doc, &start("sbml"), &Context::Document);
        assert_eq!(root, Context::Node(doc.root()));

        let model = package.process_start_element(&mut doc, &start("model"), &root);
        let Context::Node(model) = model else {
            panic!("model not created");
        };
        assert_eq!(doc.kind(model), Some(ElementKind::Model));

        let list = package.process_start_element(&mut doc, &start("listOfSpecies"), &Context::Node(model));
        let species = package.process_start_element(&mut doc, &start("species"), &list);
        let Context::Node(species) = species else {
            panic!("species not created");
        };
        assert_eq!(doc.kind(species), Some(ElementKind::Species));
        assert_eq!(Context::Node(doc.parent(species).unwrap()), list);
    }

    #[test]
    fn test_unknown_child_leaves_context() {
        let mut doc = Document::new();
        let package = CorePackage;
        let root = Context::Node(doc.root());
        let model = package.process_start_element(&mut doc, &start("model"), &root);

        assert_eq!(package.process_start_element(&mut doc, &start("notes"), &model), model);
        // a species container does not accept parameters
        let list = package.process_start_element(&mut doc, &start("listOfSpecies"), &model);
        assert_eq!(package.process_start_element(&mut doc, &start("parameter"), &list), list);
        // event assignments only live below events
        assert_eq!(
            package.process_start_element(&mut doc, &start("listOfEventAssignments"), &model),
            model
        );
    }

    #[test]
    fn test_sbml_namespace_sets_level() {
        let mut doc = Document::new();
        let element = StartElement {
            namespace_uri: NAMESPACE_L3V2,
            ..start("sbml")
        };
        CorePackage.process_start_element(&mut doc, &element, &Context::Document);
        assert_eq!(doc.version(), 2);
        assert_eq!(
            doc.property(doc.root(), "level").unwrap(),
            PropertyValue::Int(3)
        );
    }
}
