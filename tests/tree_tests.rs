#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]

use sbml_tree::events::ADD_EXTENSION;
use sbml_tree::package::{dynamic, multi};
use sbml_tree::test_utils::RecordingListener;
use sbml_tree::{
    ChangeEvent, CoreList, Document, ElementKind, ErrorKind, NodeId, Plugin, PluginKind,
    PropertyValue,
};

fn event_with_dyn_element(doc: &mut Document) -> (NodeId, NodeId, NodeId) {
    let model = doc.create_with_id(ElementKind::Model, "m").unwrap();
    doc.attach_child(doc.root(), model).unwrap();
    let events = doc.get_or_create_list(model, CoreList::Events).unwrap();
    let event = doc.create_with_id(ElementKind::Event, "e1").unwrap();
    doc.list_append(events, event).unwrap();
    let list = doc
        .get_or_create_plugin_list(event, dynamic::NAMESPACE_L3V1V1, dynamic::LIST_OF_DYN_ELEMENTS)
        .unwrap();
    let element = doc.create_node(ElementKind::DynElement).unwrap();
    doc.list_append(list, element).unwrap();
    (event, list, element)
}

#[test]
fn test_plugin_singleton_per_namespace() {
    let mut doc = Document::new();
    let (event, _, _) = event_with_dyn_element(&mut doc);
    let (_, recorder) = doc.subscribe(RecordingListener::default());

    let mut first = Plugin::new(PluginKind::DynEvent);
    first.set_value("cboTerm", Some(PropertyValue::from("first"))).unwrap();
    let mut second = Plugin::new(PluginKind::DynEvent);
    second.set_value("cboTerm", Some(PropertyValue::from("second"))).unwrap();

    doc.add_extension(event, dynamic::NAMESPACE_L3V1V1, first).unwrap();
    let replaced = doc
        .add_extension(event, dynamic::NAMESPACE_L3V1V1, second)
        .unwrap()
        .unwrap();
    assert_eq!(replaced.value("cboTerm"), Some(&PropertyValue::from("first")));

    let node = doc.get(event).unwrap();
    assert_eq!(node.extensions().len(), 1);
    assert_eq!(
        doc.plugin_property(event, dynamic::NAMESPACE_L3V1V1, "cboTerm").unwrap(),
        PropertyValue::from("second")
    );

    let extension_events: Vec<_> = recorder
        .borrow()
        .events
        .iter()
        .filter(|e| matches!(e, ChangeEvent::PropertyChanged { property, .. } if property == ADD_EXTENSION))
        .cloned()
        .collect();
    assert_eq!(extension_events.len(), 2);
    let ChangeEvent::PropertyChanged { old, new, .. } = &extension_events[1] else {
        panic!("expected a property change");
    };
    assert_eq!(old, &Some(PropertyValue::from(dynamic::NAMESPACE_L3V1V1)));
    assert_eq!(new, &Some(PropertyValue::from(dynamic::NAMESPACE_L3V1V1)));
}

#[test]
fn test_replacing_plugin_drops_its_containers() {
    let mut doc = Document::new();
    let (event, list, element) = event_with_dyn_element(&mut doc);
    doc.add_extension(event, dynamic::NAMESPACE_L3V1V1, Plugin::new(PluginKind::DynEvent))
        .unwrap();
    assert!(!doc.contains(list));
    assert!(!doc.contains(element));
    assert!(doc
        .plugin_list(event, dynamic::NAMESPACE_L3V1V1, dynamic::LIST_OF_DYN_ELEMENTS)
        .is_none());
}

#[test]
fn test_exclusive_parentage() {
    let mut doc = Document::new();
    let model = doc.create_node(ElementKind::Model).unwrap();
    doc.attach_child(doc.root(), model).unwrap();
    let parameters = doc.get_or_create_list(model, CoreList::Parameters).unwrap();
    let parameter = doc.create_with_id(ElementKind::Parameter, "k").unwrap();
    doc.list_append(parameters, parameter).unwrap();

    let other = doc.create_list(CoreList::Parameters);
    let err = doc.list_append(other, parameter).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::AlreadyHasParent { .. }));
    assert_eq!(doc.list_len(other), 0);

    doc.detach(parameter).unwrap();
    doc.list_append(other, parameter).unwrap();
    assert_eq!(doc.list_len(parameters), 0);
    assert_eq!(doc.parent(parameter), Some(other));
}

#[test]
fn test_events_follow_mutation_order() {
    let mut doc = Document::new();
    let (_, recorder) = doc.subscribe(RecordingListener::default());

    let model = doc.create_node(ElementKind::Model).unwrap();
    doc.attach_child(doc.root(), model).unwrap();
    doc.set_property(model, "id", "m").unwrap();
    let list = doc.get_or_create_list(model, CoreList::Parameters).unwrap();
    let parameter = doc.create_node(ElementKind::Parameter).unwrap();
    doc.list_append(list, parameter).unwrap();
    doc.set_property(parameter, "value", 1.0).unwrap();
    doc.detach(parameter).unwrap();

    assert_eq!(
        recorder.borrow().events,
        vec![
            ChangeEvent::Added { node: model },
            ChangeEvent::PropertyChanged {
                node: model,
                namespace: None,
                property: "id".to_string(),
                old: None,
                new: Some(PropertyValue::from("m")),
            },
            ChangeEvent::Added { node: list },
            ChangeEvent::Added { node: parameter },
            ChangeEvent::PropertyChanged {
                node: parameter,
                namespace: None,
                property: "value".to_string(),
                old: None,
                new: Some(PropertyValue::Double(1.0)),
            },
            ChangeEvent::Removed {
                node: parameter,
                previous_parent: Some(list),
                subtree: vec![parameter],
            },
        ]
    );
}

#[test]
fn test_no_op_sets_never_fire() {
    let mut doc = Document::new();
    let (event, _, _) = event_with_dyn_element(&mut doc);
    doc.set_property(event, "useValuesFromTriggerTime", false).unwrap();
    doc.set_plugin_property(event, dynamic::NAMESPACE_L3V1V1, "applyToAll", true)
        .unwrap();
    let (_, recorder) = doc.subscribe(RecordingListener::default());

    doc.set_property(event, "useValuesFromTriggerTime", false).unwrap();
    doc.set_property(event, "id", "e1").unwrap();
    doc.set_plugin_property(event, dynamic::NAMESPACE_L3V1V1, "applyToAll", true)
        .unwrap();
    doc.unset_property(event, "name").unwrap();
    doc.get_or_create_extension(event, dynamic::NAMESPACE_L3V1V1).unwrap();
    assert!(recorder.borrow().events.is_empty());
}

#[test]
fn test_host_removal_fires_once() {
    let mut doc = Document::new();
    let (event, list, element) = event_with_dyn_element(&mut doc);
    let events_list = doc.parent(event).unwrap();
    let (_, recorder) = doc.subscribe(RecordingListener::default());

    doc.remove(event).unwrap();
    assert_eq!(
        recorder.borrow().events,
        vec![ChangeEvent::Removed {
            node: event,
            previous_parent: Some(events_list),
            subtree: vec![event, list, element],
        }]
    );
}

#[test]
fn test_unset_required_property_names_owner() {
    let mut doc = Document::new();
    let parameter = doc.create_with_id(ElementKind::Parameter, "k1").unwrap();
    let err = doc.property(parameter, "value").unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::PropertyNotSet {
            property: "value".to_string(),
            element: "parameter".to_string(),
            id: Some("k1".to_string()),
        }
    );
    assert_eq!(err.to_string(), "property 'value' is not set on parameter 'k1' and has no default");
}

#[test]
fn test_closed_vocabulary_enforced_programmatically() {
    let mut doc = Document::new();
    let site = doc.create_node(ElementKind::OutwardBindingSite).unwrap();
    doc.set_property(site, "bindingStatus", "bound").unwrap();
    let err = doc.set_property(site, "bindingStatus", "loose").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidEnumValue { .. }));
    assert_eq!(
        doc.property(site, "bindingStatus").unwrap(),
        PropertyValue::from("bound")
    );
}

#[test]
fn test_plugin_on_container_rejected() {
    let mut doc = Document::new();
    let list = doc.create_list(CoreList::Species);
    let err = doc
        .get_or_create_extension(list, dynamic::NAMESPACE_L3V1V1)
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotAHost { .. }));

    let species = doc.create_node(ElementKind::Species).unwrap();
    let err = doc
        .get_or_create_extension(species, "urn:unknown")
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownPackage { .. }));
}

#[test]
fn test_add_extension_checks_namespace_and_kind() {
    let mut doc = Document::new();
    let model = doc.create_node(ElementKind::Model).unwrap();
    doc.attach_child(doc.root(), model).unwrap();

    let err = doc
        .add_extension(model, dynamic::NAMESPACE_L3V1V1, Plugin::new(PluginKind::MultiModel))
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::PluginMismatch {
            namespace: dynamic::NAMESPACE_L3V1V1.to_string(),
            expected: "DynSBasePlugin".to_string(),
            found: "MultiModelPlugin".to_string(),
        }
    );
    assert!(doc.extension(model, dynamic::NAMESPACE_L3V1V1).is_none());
    assert!(doc
        .get_or_create_plugin_list(model, dynamic::NAMESPACE_L3V1V1, multi::LIST_OF_SPECIES_TYPES)
        .is_err());

    // right package, wrong variant for the host
    let err = doc
        .add_extension(model, multi::NAMESPACE_L3V1V1, Plugin::new(PluginKind::MultiSpecies))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::PluginMismatch { .. }));

    let err = doc
        .add_extension(model, "urn:unknown", Plugin::new(PluginKind::MultiModel))
        .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownPackage { .. }));

    doc.add_extension(model, multi::NAMESPACE_L3V1V1, Plugin::new(PluginKind::MultiModel))
        .unwrap();
    assert_eq!(
        doc.extension(model, multi::NAMESPACE_L3V1V1).map(Plugin::kind),
        Some(PluginKind::MultiModel)
    );
}

#[test]
fn test_repeated_nan_set_does_not_fire() {
    let mut doc = Document::new();
    let model = doc.create_node(ElementKind::Model).unwrap();
    doc.attach_child(doc.root(), model).unwrap();
    let list = doc.get_or_create_list(model, CoreList::Parameters).unwrap();
    let parameter = doc.create_with_id(ElementKind::Parameter, "k").unwrap();
    doc.list_append(list, parameter).unwrap();
    doc.set_property(parameter, "value", f64::NAN).unwrap();
    let (_, recorder) = doc.subscribe(RecordingListener::default());

    doc.set_property(parameter, "value", f64::NAN).unwrap();
    assert!(recorder.borrow().events.is_empty());

    doc.set_property(parameter, "value", 1.0).unwrap();
    assert_eq!(recorder.borrow().events.len(), 1);
}
