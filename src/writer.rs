//! Document writer
//!
//! Builds an [`XmlElement`] tree by asking, for every node, the owning
//! package and then each attached extension package for the attributes and
//! children they contribute.

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::config::WriterConfig;
use crate::package::{Package, PackageRegistry};
use crate::tree::{Document, NodeId};
use crate::xml::{render, XmlContent, XmlElement};

#[derive(Clone, Copy, Debug, Default)]
pub struct Writer {
    config: WriterConfig,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Serialize `doc` to text
    #[instrument(level = "debug", skip(self, doc), fields(nodes = doc.len()))]
    pub fn write(&self, doc: &Document) -> String {
        render(&self.to_element(doc), &self.config)
    }

    /// Build the output element tree rooted at `sbml`
    pub fn to_element(&self, doc: &Document) -> XmlElement {
        let registry = doc.registry();
        let root = doc.root();

        let mut declarations = IndexMap::new();
        declarations.insert("xmlns".to_string(), doc.core_namespace().to_string());
        let mut element = element_for(doc, registry, root);
        declarations.extend(element.attributes.drain(..));

        for (package, namespace) in packages_in_use(doc, registry) {
            let label = package.short_label();
            declarations.insert(format!("xmlns:{label}"), namespace);
            declarations.insert(format!("{label}:required"), package.is_required().to_string());
        }
        element.attributes = declarations;
        element
    }
}

fn element_for(doc: &Document, registry: &PackageRegistry, id: NodeId) -> XmlElement {
    let mut element = XmlElement::new(doc.qualified_name(id));
    let Some(node) = doc.node(id) else {
        return element;
    };
    let owner = registry.for_node(node);

    let mut children = Vec::new();
    if let Some(owner) = owner {
        element.attributes.extend(owner.write_xml_attributes(doc, id));
        children.extend(owner.elements_to_write(doc, id));
    }
    for namespace in node.extensions().keys() {
        let Some(package) = registry.by_namespace(namespace) else {
            debug!(namespace = %namespace, element = %element.name, "plugin of unregistered package not written");
            continue;
        };
        if owner.is_some_and(|owner| owner.package_name() == package.package_name()) {
            continue;
        }
        element.attributes.extend(package.write_xml_attributes(doc, id));
        for child in package.elements_to_write(doc, id) {
            if !children.contains(&child) {
                children.push(child);
            }
        }
    }

    element.children = children
        .into_iter()
        .map(|child| XmlContent::Element(element_for(doc, registry, child)))
        .collect();
    element
}

/// Extension packages used anywhere below the root, in registry order
fn packages_in_use<'r>(doc: &Document, registry: &'r PackageRegistry) -> Vec<(&'r dyn Package, String)> {
    let mut namespaces: IndexMap<&'static str, String> = IndexMap::new();
    for id in doc.subtree(doc.root()) {
        let Some(node) = doc.node(id) else {
            continue;
        };
        let used = node
            .package_name()
            .map(|_| node.namespace_uri())
            .into_iter()
            .chain(node.extensions().keys().map(String::as_str));
        for namespace in used {
            if let Some(package) = registry.by_namespace(namespace) {
                namespaces
                    .entry(package.package_name())
                    .or_insert_with(|| namespace.to_string());
            }
        }
    }

    registry
        .packages()
        .filter_map(|package| {
            namespaces
                .get(package.package_name())
                .map(|namespace| (package, namespace.clone()))
        })
        .filter(|(package, _)| package.package_name() != crate::package::core::PACKAGE_NAME)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::package::{dynamic, multi};
    use crate::tree::{CoreList, ElementKind};

    #[test]
    fn test_empty_document() {
        let doc = Document::new();
        let out = Writer::with_config(WriterConfig::compact()).write(&doc);
        assert_eq!(
            out,
            r#"<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1"/>"#
        );
    }

    #[test]
    fn test_empty_containers_not_written() {
        let mut doc = Document::new();
        let model = doc.create_with_id(ElementKind::Model, "m").unwrap();
        doc.attach_child(doc.root(), model).unwrap();
        doc.get_or_create_list(model, CoreList::Species).unwrap();
        let event = doc.create_node(ElementKind::Event).unwrap();
        doc.get_or_create_plugin_list(event, dynamic::NAMESPACE_L3V1V1, dynamic::LIST_OF_DYN_ELEMENTS)
            .unwrap();
        let events = doc.get_or_create_list(model, CoreList::Events).unwrap();
        doc.list_append(events, event).unwrap();

        let root = Writer::new().to_element(&doc);
        let model = root.child("model").unwrap();
        assert!(model.child("listOfSpecies").is_none());
        let event = model.child("listOfEvents").unwrap().child("event").unwrap();
        assert!(event.children.is_empty());
        // the plugin exists, so the namespace is declared
        assert_eq!(root.attribute("dyn:required"), Some("false"));
    }

    #[test]
    fn test_plugin_content_after_own_children() {
        let mut doc = Document::new();
        let model = doc.create_with_id(ElementKind::Model, "m").unwrap();
        doc.attach_child(doc.root(), model).unwrap();
        let list = doc
            .get_or_create_plugin_list(model, multi::NAMESPACE_L3V1V1, multi::LIST_OF_SPECIES_TYPES)
            .unwrap();
        let species_type = doc.create_with_id(ElementKind::SpeciesType, "st").unwrap();
        doc.list_append(list, species_type).unwrap();
        doc.get_or_create_list(model, CoreList::Parameters).unwrap();
        let parameters = doc.core_list(model, CoreList::Parameters).unwrap();
        let parameter = doc.create_with_id(ElementKind::Parameter, "k").unwrap();
        doc.list_append(parameters, parameter).unwrap();

        let root = Writer::new().to_element(&doc);
        let names: Vec<&str> = root
            .child("model")
            .unwrap()
            .elements()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["listOfParameters", "multi:listOfSpeciesTypes"]);
        assert_eq!(
            root.attributes.keys().map(String::as_str).collect::<Vec<_>>(),
            ["xmlns", "level", "version", "xmlns:multi", "multi:required"]
        );
        let species_type = root
            .child("model")
            .unwrap()
            .child("multi:listOfSpeciesTypes")
            .unwrap()
            .child("multi:speciesType")
            .unwrap();
        assert_eq!(species_type.attribute("multi:id"), Some("st"));
    }
}
