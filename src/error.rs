//! Error types for sbml-tree
//!
//! Hard failures abort the current operation and surface as [`Error`]. Soft
//! failures (unknown attributes, unrecognized nesting, factory and mirror
//! misses) are logged where they happen and never reach this type.

use std::fmt;
use thiserror::Error;

/// Position in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn at(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed XML
    Syntax,
    MaxDepthExceeded {
        max: u16,
    },
    MaxSizeExceeded {
        max: usize,
    },
    /// Value outside a closed vocabulary
    InvalidEnumValue {
        value: String,
        attribute: String,
        element: String,
    },
    /// Value that does not parse as the attribute's type
    InvalidValue {
        value: String,
        attribute: String,
        element: String,
        expected: &'static str,
    },
    PropertyNotSet {
        property: String,
        element: String,
        id: Option<String>,
    },
    UnknownProperty {
        property: String,
        element: String,
    },
    TypeMismatch {
        property: String,
        expected: &'static str,
    },
    NodeNotFound,
    AlreadyHasParent {
        element: String,
    },
    /// Attaching a node below one of its own descendants
    HierarchyRequest,
    KindMismatch {
        expected: String,
        found: String,
    },
    IndexOutOfBounds {
        index: usize,
        len: usize,
    },
    NotAHost {
        element: String,
    },
    /// No registered package claims the namespace
    UnknownPackage {
        namespace: String,
    },
    /// Plugin offered for a namespace or host it does not belong to
    PluginMismatch {
        namespace: String,
        expected: String,
        found: String,
    },
    /// Plugin has no container of that name
    UnknownContainer {
        name: String,
        owner: String,
    },
    Io(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "malformed xml"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
            Self::InvalidEnumValue {
                value,
                attribute,
                element,
            } => write!(
                f,
                "could not recognize the value '{value}' for the attribute '{attribute}' on the '{element}' element"
            ),
            Self::InvalidValue {
                value,
                attribute,
                element,
                expected,
            } => write!(
                f,
                "the value '{value}' of the attribute '{attribute}' on the '{element}' element is not a valid {expected}"
            ),
            Self::PropertyNotSet {
                property,
                element,
                id,
            } => match id {
                Some(id) => write!(
                    f,
                    "property '{property}' is not set on {element} '{id}' and has no default"
                ),
                None => write!(
                    f,
                    "property '{property}' is not set on {element} and has no default"
                ),
            },
            Self::UnknownProperty { property, element } => {
                write!(f, "{element} has no property named '{property}'")
            }
            Self::TypeMismatch { property, expected } => {
                write!(f, "property '{property}' expects a {expected} value")
            }
            Self::NodeNotFound => write!(f, "node not found"),
            Self::AlreadyHasParent { element } => write!(
                f,
                "{element} already has a parent and must be detached first"
            ),
            Self::HierarchyRequest => {
                write!(f, "a node cannot be attached below one of its descendants")
            }
            Self::KindMismatch { expected, found } => {
                write!(f, "container holds {expected} elements, found {found}")
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::NotAHost { element } => write!(f, "{element} cannot carry plugins"),
            Self::UnknownPackage { namespace } => {
                write!(f, "no package registered for namespace '{namespace}'")
            }
            Self::PluginMismatch {
                namespace,
                expected,
                found,
            } => write!(
                f,
                "namespace '{namespace}' expects {expected} on this host, found {found}"
            ),
            Self::UnknownContainer { name, owner } => {
                write!(f, "{owner} has no container named '{name}'")
            }
            Self::Io(message) => write!(f, "io error: {message}"),
        }
    }
}

/// Main error type for sbml-tree
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Option<Span>,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span: None,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span: Some(span),
            message: message.into(),
        }
    }

    /// Syntax error at a source position
    pub fn syntax(pos: Pos, message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Syntax, Span::at(pos), message)
    }

    pub fn invalid_enum(value: &str, attribute: &str, element: &str) -> Self {
        Self::new(ErrorKind::InvalidEnumValue {
            value: value.to_string(),
            attribute: attribute.to_string(),
            element: element.to_string(),
        })
    }

    pub fn invalid_value(value: &str, attribute: &str, element: &str, expected: &'static str) -> Self {
        Self::new(ErrorKind::InvalidValue {
            value: value.to_string(),
            attribute: attribute.to_string(),
            element: element.to_string(),
            expected,
        })
    }

    /// Attach a source position unless one is already present
    #[must_use]
    pub fn at(mut self, pos: Pos) -> Self {
        if self.span.is_none() {
            self.span = Some(Span::at(pos));
        }
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "error at {}: {}", span.start, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io(err.to_string()))
    }
}

/// Result type alias for sbml-tree
pub type Result<T> = std::result::Result<T, Error>;
