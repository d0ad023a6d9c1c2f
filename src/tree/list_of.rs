//! Ordered homogeneous containers

use crate::tree::node::ElementKind;

/// Core containers with a fixed schema name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoreList {
    Compartments,
    Species,
    Parameters,
    Events,
    EventAssignments,
}

impl CoreList {
    pub const ALL: [Self; 5] = [
        Self::Compartments,
        Self::Species,
        Self::Parameters,
        Self::Events,
        Self::EventAssignments,
    ];

    pub const fn element_name(self) -> &'static str {
        match self {
            Self::Compartments => "listOfCompartments",
            Self::Species => "listOfSpecies",
            Self::Parameters => "listOfParameters",
            Self::Events => "listOfEvents",
            Self::EventAssignments => "listOfEventAssignments",
        }
    }

    pub const fn item_kind(self) -> ElementKind {
        match self {
            Self::Compartments => ElementKind::Compartment,
            Self::Species => ElementKind::Species,
            Self::Parameters => ElementKind::Parameter,
            Self::Events => ElementKind::Event,
            Self::EventAssignments => ElementKind::EventAssignment,
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|list| list.element_name() == name)
    }
}

/// Which list a container represents
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ListType {
    Core(CoreList),
    /// Package-defined list, named out of band
    Other(String),
}

impl ListType {
    pub fn element_name(&self) -> &str {
        match self {
            Self::Core(list) => list.element_name(),
            Self::Other(name) => name,
        }
    }
}

/// Container metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListOf {
    pub(crate) list_type: ListType,
    pub(crate) item_kind: ElementKind,
}

impl ListOf {
    pub fn core(list: CoreList) -> Self {
        Self {
            list_type: ListType::Core(list),
            item_kind: list.item_kind(),
        }
    }

    pub fn other(name: impl Into<String>, item_kind: ElementKind) -> Self {
        Self {
            list_type: ListType::Other(name.into()),
            item_kind,
        }
    }

    pub fn list_type(&self) -> &ListType {
        &self.list_type
    }

    /// The single kind every item must have
    pub fn item_kind(&self) -> ElementKind {
        self.item_kind
    }
}
