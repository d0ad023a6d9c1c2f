//! XML plumbing: pull tokenizer with namespace resolution, output element tree
//! and string rendering

pub mod cursor;
pub mod event;
pub mod model;
pub mod tokenizer;
pub mod writer;

pub use event::{QName, XmlAttribute, XmlEvent};
pub use model::{XmlContent, XmlElement};
pub use tokenizer::Tokenizer;
pub use writer::render;

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
