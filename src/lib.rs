//! sbml-tree: an extensible SBML document tree
//!
//! This crate provides:
//! - An arena-backed document tree with homogeneous containers
//! - Package plugins attached to host nodes under a namespace
//! - A namespace-driven reader and writer dispatching to packages
//! - Synchronous change notification and a mirror synchronizer that keeps a
//!   foreign tree in step with the document
//!
//! # Examples
//! ```
//! use sbml_tree::{read_str, write_string, Result};
//!
//! fn example() -> Result<()> {
//!     let doc = read_str(r#"<sbml xmlns="http://www.sbml.org/sbml/level3/version1/core" level="3" version="1"/>"#)?;
//!     println!("{}", write_string(&doc));
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

use std::path::Path;

use tracing::{debug, instrument};

pub mod config;
pub mod error;
pub mod events;
pub mod mirror;
pub mod package;
pub mod plugin;
pub mod reader;
pub mod test_utils;
pub mod tree;
pub mod value;
pub mod writer;
pub mod xml;

// Re-exports
pub use config::{ReaderConfig, WriterConfig};
pub use error::{Error, ErrorKind, Result};
pub use events::{ChangeEvent, ChangeListener, ListenerId};
pub use mirror::{MirrorError, MirrorSynchronizer, MirrorTree};
pub use package::{Package, PackageRegistry};
pub use plugin::{Plugin, PluginKind};
pub use reader::Reader;
pub use tree::{CoreList, Document, ElementKind, Node, NodeId};
pub use value::PropertyValue;
pub use writer::Writer;

/// Read a document from a string with default limits
#[instrument(level = "debug", skip(input), fields(len = input.len()))]
pub fn read_str(input: &str) -> Result<Document> {
    Reader::new().read(input)
}

#[instrument]
pub fn read_file(path: &Path) -> Result<Document> {
    let content = std::fs::read_to_string(path)?;
    debug!(bytes = content.len(), "file read");
    read_str(&content)
}

/// Serialize with the default writer settings
pub fn write_string(doc: &Document) -> String {
    Writer::new().write(doc)
}

#[instrument(skip(doc))]
pub fn write_file(doc: &Document, path: &Path) -> Result<()> {
    std::fs::write(path, write_string(doc))?;
    debug!("file written");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::test_utils::{tmp_file_path, DYN_EVENT_MODEL};

    #[test]
    fn test_file_round_trip() {
        let path = tmp_file_path("lib_round_trip.xml");
        let doc = read_str(DYN_EVENT_MODEL).unwrap();
        write_file(&doc, &path).unwrap();
        let again = read_file(&path).unwrap();
        assert_eq!(write_string(&again), write_string(&doc));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_file(&tmp_file_path("does_not_exist.xml")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Io(_)));
    }
}
