//! Shared fixtures for unit and integration tests

use std::collections::HashSet;
use std::fmt::Write as _;
use std::{env, fs, path::PathBuf};

use indexmap::IndexMap;

use crate::events::{ChangeEvent, ChangeListener};
use crate::mirror::{MirrorError, MirrorTree};
use crate::tree::{Document, NodeId};
use crate::value::PropertyValue;

/// Event carrying a dyn element list, as written by the dyn package
pub const DYN_EVENT_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1" xmlns:dyn="http://www.sbml.org/sbml/level3/version1/dyn/version1" dyn:required="false">
  <model id="cell">
    <listOfEvents>
      <event id="division" dyn:applyToAll="true">
        <dyn:listOfDynElements>
          <dyn:dynElement dyn:id="d1" dyn:idRef="S"/>
        </dyn:listOfDynElements>
      </event>
    </listOfEvents>
  </model>
</sbml>
"#;

pub fn tmp_file_path(name: &str) -> PathBuf {
    let mut dir = env::temp_dir();
    dir.push("sbml_tree_tests");
    let _ = fs::create_dir_all(&dir);
    dir.push(name);
    dir
}

/// Core model with `species` species and `events` events, each event
/// carrying one dyn element
pub fn generated_model(species: usize, events: usize) -> String {
    let mut out = String::from(
        r#"<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1" xmlns:dyn="http://www.sbml.org/sbml/level3/version1/dyn/version1" dyn:required="false"><model id="generated"><listOfCompartments><compartment id="c" size="1" constant="true"/></listOfCompartments>"#,
    );
    out.push_str("<listOfSpecies>");
    for i in 0..species {
        let _ = write!(
            out,
            r#"<species id="s{i}" compartment="c" initialAmount="{i}" hasOnlySubstanceUnits="false" boundaryCondition="false" constant="false"/>"#
        );
    }
    out.push_str("</listOfSpecies><listOfEvents>");
    for i in 0..events {
        let _ = write!(
            out,
            r#"<event id="e{i}" dyn:applyToAll="true"><dyn:listOfDynElements><dyn:dynElement dyn:idRef="s{i}"/></dyn:listOfDynElements></event>"#
        );
    }
    out.push_str("</listOfEvents></model></sbml>");
    out
}

/// Listener recording every event it receives, in order
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<ChangeEvent>,
}

impl ChangeListener for RecordingListener {
    fn node_added(&mut self, _doc: &Document, node: NodeId) {
        self.events.push(ChangeEvent::Added { node });
    }

    fn node_removed(
        &mut self,
        _doc: &Document,
        node: NodeId,
        previous_parent: Option<NodeId>,
        subtree: &[NodeId],
    ) {
        self.events.push(ChangeEvent::Removed {
            node,
            previous_parent,
            subtree: subtree.to_vec(),
        });
    }

    fn property_changed(&mut self, _doc: &Document, event: &ChangeEvent) {
        self.events.push(event.clone());
    }
}

/// Node of a [`ConventionTree`]
#[derive(Clone, Debug, PartialEq)]
pub struct ForeignNode {
    pub type_name: String,
    pub properties: IndexMap<String, PropertyValue>,
    pub children: Vec<usize>,
    pub parent: Option<usize>,
}

/// Foreign tree that accepts any `create<Kind>`, `set<Property>` and
/// `unset<Property>` call, except factories for rejected kinds
#[derive(Clone, Debug)]
pub struct ConventionTree {
    nodes: Vec<Option<ForeignNode>>,
    rejected: HashSet<String>,
    /// Every successful call, in order
    pub calls: Vec<String>,
}

impl Default for ConventionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConventionTree {
    pub fn new() -> Self {
        Self::rejecting(&[])
    }

    /// Tree whose factories fail for the given kinds
    pub fn rejecting(kinds: &[&str]) -> Self {
        let root = ForeignNode {
            type_name: "SBMLDocument".to_string(),
            properties: IndexMap::new(),
            children: Vec::new(),
            parent: None,
        };
        Self {
            nodes: vec![Some(root)],
            rejected: kinds.iter().map(|kind| (*kind).to_string()).collect(),
            calls: Vec::new(),
        }
    }

    pub fn node(&self, handle: usize) -> Option<&ForeignNode> {
        self.nodes.get(handle).and_then(Option::as_ref)
    }

    pub fn property(&self, handle: usize, name: &str) -> Option<&PropertyValue> {
        self.node(handle).and_then(|node| node.properties.get(name))
    }

    pub fn live_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Live node of `type_name` whose `Id` is `id`
    pub fn find(&self, type_name: &str, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| {
            node.as_ref().is_some_and(|node| {
                node.type_name == type_name
                    && node.properties.get("Id").and_then(PropertyValue::as_text) == Some(id)
            })
        })
    }

    fn node_mut(&mut self, handle: usize) -> Result<&mut ForeignNode, MirrorError> {
        self.nodes
            .get_mut(handle)
            .and_then(Option::as_mut)
            .ok_or(MirrorError::UnknownHandle)
    }
}

impl MirrorTree for ConventionTree {
    type Handle = usize;

    fn root(&self) -> usize {
        0
    }

    fn call_factory(&mut self, parent: usize, method: &str) -> Result<usize, MirrorError> {
        let owner = self.node_mut(parent)?.type_name.clone();
        let kind = method
            .strip_prefix("create")
            .filter(|kind| !kind.is_empty() && !self.rejected.contains(*kind))
            .ok_or_else(|| MirrorError::NoSuchMethod {
                method: method.to_string(),
                owner,
            })?;

        let handle = self.nodes.len();
        self.nodes.push(Some(ForeignNode {
            type_name: kind.to_string(),
            properties: IndexMap::new(),
            children: Vec::new(),
            parent: Some(parent),
        }));
        self.node_mut(parent)?.children.push(handle);
        self.calls.push(method.to_string());
        Ok(handle)
    }

    fn call_setter(&mut self, target: usize, method: &str, value: &PropertyValue) -> Result<(), MirrorError> {
        let node = self.node_mut(target)?;
        let property = method
            .strip_prefix("set")
            .ok_or_else(|| MirrorError::NoSuchMethod {
                method: method.to_string(),
                owner: node.type_name.clone(),
            })?;
        node.properties.insert(property.to_string(), value.clone());
        self.calls.push(method.to_string());
        Ok(())
    }

    fn call_unsetter(&mut self, target: usize, method: &str) -> Result<(), MirrorError> {
        let node = self.node_mut(target)?;
        let property = method
            .strip_prefix("unset")
            .ok_or_else(|| MirrorError::NoSuchMethod {
                method: method.to_string(),
                owner: node.type_name.clone(),
            })?;
        node.properties.shift_remove(property);
        self.calls.push(method.to_string());
        Ok(())
    }

    fn destroy(&mut self, target: usize) -> Result<(), MirrorError> {
        let parent = self.node_mut(target)?.parent;
        if let Some(parent) = parent {
            self.node_mut(parent)?.children.retain(|child| *child != target);
        }
        let mut stack = vec![target];
        while let Some(handle) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(handle).and_then(Option::take) {
                stack.extend(node.children);
            }
        }
        self.calls.push("destroy".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_convention_tree_calls() {
        let mut tree = ConventionTree::rejecting(&["Event"]);
        let model = tree.call_factory(0, "createModel").unwrap();
        tree.call_setter(model, "setId", &PropertyValue::from("m")).unwrap();
        assert_eq!(tree.find("Model", "m"), Some(model));

        let err = tree.call_factory(model, "createEvent").unwrap_err();
        assert_eq!(
            err,
            MirrorError::NoSuchMethod {
                method: "createEvent".to_string(),
                owner: "Model".to_string(),
            }
        );

        let parameter = tree.call_factory(model, "createParameter").unwrap();
        tree.destroy(model).unwrap();
        assert!(tree.node(parameter).is_none());
        assert_eq!(tree.live_count(), 1);
        assert_eq!(tree.destroy(model).unwrap_err(), MirrorError::UnknownHandle);
    }
}
