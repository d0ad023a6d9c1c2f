//! Events emitted by the pull tokenizer

use std::fmt;

use indexmap::IndexMap;

use crate::error::Pos;

/// Possibly prefixed XML name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    /// Split `prefix:local`; names without a colon have no prefix
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            _ => Self {
                prefix: None,
                local: raw.to_string(),
            },
        }
    }

    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Attribute with its prefix resolved
///
/// Unprefixed attributes carry no namespace of their own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QName,
    pub namespace_uri: Option<String>,
    pub value: String,
}

/// Tokenizer event
#[derive(Clone, Debug, PartialEq)]
pub enum XmlEvent {
    StartElement {
        name: QName,
        namespace_uri: Option<String>,
        attributes: Vec<XmlAttribute>,
        /// Declarations made on this element, keyed by prefix ("" for the default namespace)
        namespaces: IndexMap<String, String>,
        pos: Pos,
    },
    EndElement {
        name: QName,
        namespace_uri: Option<String>,
    },
    /// Non-whitespace character data (entities decoded, CDATA passed through)
    Text(String),
}
