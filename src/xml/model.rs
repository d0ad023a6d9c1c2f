//! Output element tree built by the writer

use indexmap::IndexMap;

/// XML element
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<XmlContent>,
}

/// XML content node
#[derive(Clone, Debug, PartialEq)]
pub enum XmlContent {
    Element(XmlElement),
    Text(String),
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Child elements in document order, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|child| match child {
            XmlContent::Element(element) => Some(element),
            XmlContent::Text(_) => None,
        })
    }

    /// First child element with the given qualified name
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.elements().find(|element| element.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_navigation() {
        let mut event = XmlElement::new("event");
        event.children.push(XmlContent::Text("ignored".to_string()));
        event
            .children
            .push(XmlContent::Element(XmlElement::new("dyn:listOfDynElements")));

        assert_eq!(event.elements().count(), 1);
        assert!(event.child("dyn:listOfDynElements").is_some());
        assert!(event.child("listOfEventAssignments").is_none());
    }
}
