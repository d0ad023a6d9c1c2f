//! Document reader
//!
//! Drives the registered packages from tokenizer events. Each start tag is
//! offered to the package owning its namespace together with the current
//! context object; the returned context becomes the parent for nested tags
//! and attributes. Anything no package recognizes is logged and skipped.

use std::rc::Rc;

use tracing::{debug, instrument, warn};

use crate::config::ReaderConfig;
use crate::error::Result;
use crate::package::{AttributeInfo, Context, PackageRegistry, StartElement};
use crate::tree::Document;
use crate::xml::{Tokenizer, XmlEvent};

#[derive(Clone, Copy, Debug, Default)]
pub struct Reader {
    config: ReaderConfig,
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a document using the bundled packages
    #[instrument(level = "debug", skip(self, input), fields(len = input.len()))]
    pub fn read(&self, input: &str) -> Result<Document> {
        self.read_with_registry(input, Rc::new(PackageRegistry::default()))
    }

    /// Read a document using an explicit package registry
    pub fn read_with_registry(&self, input: &str, registry: Rc<PackageRegistry>) -> Result<Document> {
        let mut doc = Document::with_registry(registry);
        self.read_into(&mut doc, input)?;
        Ok(doc)
    }

    /// Read `input` into an existing (normally fresh) document
    ///
    /// Listeners already registered on `doc` observe the construction.
    pub fn read_into(&self, doc: &mut Document, input: &str) -> Result<()> {
        let registry = Rc::clone(doc.registry());
        let mut tokenizer = Tokenizer::with_config(input.as_bytes(), self.config)?;
        let mut stack: Vec<Context> = Vec::new();
        let mut context = Context::Document;
        // depth inside an ignored subtree
        let mut skipping = 0usize;

        while let Some(event) = tokenizer.next_event()? {
            match event {
                XmlEvent::StartElement {
                    name,
                    namespace_uri,
                    attributes,
                    namespaces,
                    pos,
                } => {
                    if skipping > 0 {
                        skipping += 1;
                        continue;
                    }

                    let namespace = namespace_uri.as_deref().unwrap_or_default();
                    let Some(package) = registry.by_namespace(namespace) else {
                        warn!(element = %name, namespace, at = %pos, "unknown namespace, element skipped");
                        skipping = 1;
                        continue;
                    };

                    let start = StartElement {
                        name: &name.local,
                        namespace_uri: namespace,
                        has_attributes: !attributes.is_empty(),
                        has_namespaces: !namespaces.is_empty(),
                    };
                    let next = package.process_start_element(doc, &start, &context);
                    if next == context {
                        warn!(
                            element = %name,
                            package = package.package_name(),
                            at = %pos,
                            "element not recognized here, subtree skipped"
                        );
                        skipping = 1;
                        continue;
                    }

                    let count = attributes.len();
                    for (index, attribute) in attributes.iter().enumerate() {
                        let attribute_namespace =
                            attribute.namespace_uri.as_deref().unwrap_or(namespace);
                        let info = AttributeInfo {
                            element_name: &name.local,
                            name: &attribute.name.local,
                            prefix: attribute.name.prefix.as_deref(),
                            value: &attribute.value,
                            namespace_uri: attribute_namespace,
                            is_last: index + 1 == count,
                        };
                        let consumed = match registry.by_namespace(attribute_namespace) {
                            Some(owner) => owner
                                .process_attribute(doc, &info, &next)
                                .map_err(|err| err.at(pos))?,
                            None => false,
                        };
                        if !consumed {
                            warn!(
                                element = %name,
                                attribute = %attribute.name,
                                value = %attribute.value,
                                at = %pos,
                                "unknown attribute ignored"
                            );
                        }
                    }

                    stack.push(context);
                    context = next;
                }
                XmlEvent::EndElement { name, .. } => {
                    if skipping > 0 {
                        skipping -= 1;
                        continue;
                    }
                    context = stack.pop().unwrap_or(Context::Document);
                    debug!(element = %name, "element closed");
                }
                XmlEvent::Text(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]

    use super::*;
    use crate::error::ErrorKind;
    use crate::package::dynamic;
    use crate::tree::{CoreList, ElementKind};
    use crate::value::PropertyValue;

    const MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1"
      xmlns:dyn="http://www.sbml.org/sbml/level3/version1/dyn/version1" dyn:required="false">
  <model id="cell_cycle" name="Cell cycle">
    <listOfCompartments>
      <compartment id="cell" size="1" constant="true"/>
    </listOfCompartments>
    <listOfSpecies>
      <species id="S" compartment="cell" initialAmount="10" hasOnlySubstanceUnits="false"
               boundaryCondition="false" constant="false"/>
    </listOfSpecies>
    <listOfEvents>
      <event id="division" useValuesFromTriggerTime="true" dyn:applyToAll="true">
        <dyn:listOfDynElements>
          <dyn:dynElement dyn:idRef="S"/>
        </dyn:listOfDynElements>
      </event>
    </listOfEvents>
  </model>
</sbml>
"#;

    #[test]
    fn test_read_builds_tree() {
        let doc = Reader::new().read(MODEL).unwrap();
        let model = doc.children(doc.root())[0];
        assert_eq!(doc.get(model).unwrap().id(), Some("cell_cycle"));

        let species = doc.core_list(model, CoreList::Species).unwrap();
        let s = doc.list_find_by_id(species, "S").unwrap();
        assert_eq!(
            doc.property(s, "initialAmount").unwrap(),
            PropertyValue::Double(10.0)
        );

        let events = doc.core_list(model, CoreList::Events).unwrap();
        let event = doc.list_get(events, 0).unwrap();
        assert_eq!(
            doc.plugin_property(event, dynamic::NAMESPACE_L3V1V1, "applyToAll").unwrap(),
            PropertyValue::Bool(true)
        );
        let list = doc
            .plugin_list(event, dynamic::NAMESPACE_L3V1V1, dynamic::LIST_OF_DYN_ELEMENTS)
            .unwrap();
        let element = doc.list_get(list, 0).unwrap();
        assert_eq!(doc.kind(element), Some(ElementKind::DynElement));
        assert_eq!(doc.property(element, "idRef").unwrap(), PropertyValue::from("S"));
    }

    #[test]
    fn test_unknown_content_is_skipped() {
        let input = r#"<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1">
  <model id="m" color="blue">
    <annotation><foo xmlns="urn:foo"><model id="inner"/></foo></annotation>
    <x:thing xmlns:x="urn:x"/>
    <listOfParameters><parameter id="k" value="2"/></listOfParameters>
  </model>
</sbml>"#;
        let doc = Reader::new().read(input).unwrap();
        let model = doc.children(doc.root())[0];
        let parameters = doc.core_list(model, CoreList::Parameters).unwrap();
        assert_eq!(doc.list_len(parameters), 1);
        assert_eq!(doc.children(doc.root()).len(), 1);
    }

    #[test]
    fn test_bad_boolean_reports_position() {
        let input = r#"<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1">
<model><listOfParameters><parameter id="k" constant="maybe"/></listOfParameters></model></sbml>"#;
        let err = Reader::new().read(input).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidValue { .. }));
        assert_eq!(err.span().unwrap().start.line, 2);
    }

    #[test]
    fn test_depth_limit_applies() {
        let reader = Reader::with_config(ReaderConfig::new(2, 0));
        let err = reader.read(MODEL).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MaxDepthExceeded { max: 2 });
    }

    #[test]
    fn test_core_only_registry_skips_packages() {
        let doc = Reader::new()
            .read_with_registry(MODEL, Rc::new(PackageRegistry::core_only()))
            .unwrap();
        let model = doc.children(doc.root())[0];
        let events = doc.core_list(model, CoreList::Events).unwrap();
        let event = doc.list_get(events, 0).unwrap();
        assert!(doc.get(event).unwrap().extensions().is_empty());
    }
}
