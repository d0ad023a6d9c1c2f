//! Tree nodes, element kinds and their property schemas

use std::fmt;

use generational_arena::Index;
use indexmap::IndexMap;

use crate::package::{dynamic, multi};
use crate::plugin::Plugin;
use crate::tree::list_of::{CoreList, ListOf};
use crate::value::{PropertyValue, ValueType};

/// Handle to a node in a [`Document`](crate::tree::Document)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) Index);

/// Closed set of element kinds across core and the bundled packages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Sbml,
    Model,
    Compartment,
    Species,
    Parameter,
    Event,
    EventAssignment,
    ListOf,
    DynElement,
    SpatialComponent,
    SpeciesType,
    OutwardBindingSite,
}

impl ElementKind {
    /// Concrete type name, as used by factory and setter conventions
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Sbml => "SBMLDocument",
            Self::Model => "Model",
            Self::Compartment => "Compartment",
            Self::Species => "Species",
            Self::Parameter => "Parameter",
            Self::Event => "Event",
            Self::EventAssignment => "EventAssignment",
            Self::ListOf => "ListOf",
            Self::DynElement => "DynElement",
            Self::SpatialComponent => "SpatialComponent",
            Self::SpeciesType => "SpeciesType",
            Self::OutwardBindingSite => "OutwardBindingSite",
        }
    }

    /// Local XML element name; containers are named by their list type
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::Sbml => "sbml",
            Self::Model => "model",
            Self::Compartment => "compartment",
            Self::Species => "species",
            Self::Parameter => "parameter",
            Self::Event => "event",
            Self::EventAssignment => "eventAssignment",
            Self::ListOf => "listOf",
            Self::DynElement => "dynElement",
            Self::SpatialComponent => "spatialComponent",
            Self::SpeciesType => "speciesType",
            Self::OutwardBindingSite => "outwardBindingSite",
        }
    }

    /// Owning package name; `None` is core
    pub const fn package_name(self) -> Option<&'static str> {
        match self {
            Self::DynElement | Self::SpatialComponent => Some(dynamic::PACKAGE_NAME),
            Self::SpeciesType | Self::OutwardBindingSite => Some(multi::PACKAGE_NAME),
            _ => None,
        }
    }

    /// Kinds carrying `id` and `name`
    pub const fn is_named(self) -> bool {
        !matches!(self, Self::Sbml | Self::ListOf | Self::EventAssignment)
    }

    /// Core containers this kind owns, in schema order
    pub const fn core_lists(self) -> &'static [CoreList] {
        match self {
            Self::Model => &[
                CoreList::Compartments,
                CoreList::Species,
                CoreList::Parameters,
                CoreList::Events,
            ],
            Self::Event => &[CoreList::EventAssignments],
            _ => &[],
        }
    }

    /// Properties specific to this kind, beyond the shared ones
    pub(crate) const fn own_properties(self) -> &'static [PropertySpec] {
        match self {
            Self::Sbml => SBML_PROPERTIES,
            Self::Compartment => COMPARTMENT_PROPERTIES,
            Self::Species => SPECIES_PROPERTIES,
            Self::Parameter => PARAMETER_PROPERTIES,
            Self::Event => EVENT_PROPERTIES,
            Self::EventAssignment => EVENT_ASSIGNMENT_PROPERTIES,
            Self::DynElement => dynamic::DYN_ELEMENT_PROPERTIES,
            Self::SpatialComponent => dynamic::SPATIAL_COMPONENT_PROPERTIES,
            Self::SpeciesType => multi::SPECIES_TYPE_PROPERTIES,
            Self::OutwardBindingSite => multi::OUTWARD_BINDING_SITE_PROPERTIES,
            Self::Model | Self::ListOf => &[],
        }
    }

    /// Full property schema in attribute order
    pub fn properties(self) -> impl Iterator<Item = &'static PropertySpec> {
        let named: &'static [PropertySpec] = if self.is_named() {
            NAMED_PROPERTIES
        } else {
            &[]
        };
        SBASE_PROPERTIES
            .iter()
            .chain(named.iter())
            .chain(self.own_properties().iter())
    }

    pub fn property_spec(self, name: &str) -> Option<&'static PropertySpec> {
        self.properties().find(|spec| spec.name == name)
    }

    /// Name under which changes to `property` are reported
    ///
    /// The numeric value of compartments, species and parameters is
    /// reported as `value`.
    pub fn event_property_name(self, property: &str) -> &str {
        match (self, property) {
            (Self::Compartment, "size")
            | (Self::Species, "initialAmount" | "initialConcentration")
            | (Self::Parameter, "value") => "value",
            _ => property,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Default for an unset property
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Double(f64),
}

impl From<DefaultValue> for PropertyValue {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Bool(b) => Self::Bool(b),
            DefaultValue::Double(n) => Self::Double(n),
        }
    }
}

/// Declared property of a node or plugin kind
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub ty: ValueType,
    pub default: Option<DefaultValue>,
}

impl PropertySpec {
    pub const fn new(name: &'static str, ty: ValueType) -> Self {
        Self {
            name,
            ty,
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, ty: ValueType, default: DefaultValue) -> Self {
        Self {
            name,
            ty,
            default: Some(default),
        }
    }
}

pub(crate) const SBASE_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("metaid", ValueType::Text),
    PropertySpec::new("sboTerm", ValueType::Text),
];

pub(crate) const NAMED_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("id", ValueType::Text),
    PropertySpec::new("name", ValueType::Text),
];

const SBML_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("level", ValueType::Int),
    PropertySpec::new("version", ValueType::Int),
];

const COMPARTMENT_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::with_default("spatialDimensions", ValueType::Double, DefaultValue::Double(3.0)),
    PropertySpec::new("size", ValueType::Double),
    PropertySpec::new("units", ValueType::Text),
    PropertySpec::new("constant", ValueType::Bool),
];

const SPECIES_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("compartment", ValueType::Text),
    PropertySpec::new("initialAmount", ValueType::Double),
    PropertySpec::new("initialConcentration", ValueType::Double),
    PropertySpec::with_default("hasOnlySubstanceUnits", ValueType::Bool, DefaultValue::Bool(false)),
    PropertySpec::with_default("boundaryCondition", ValueType::Bool, DefaultValue::Bool(false)),
    PropertySpec::new("constant", ValueType::Bool),
];

const PARAMETER_PROPERTIES: &[PropertySpec] = &[
    PropertySpec::new("value", ValueType::Double),
    PropertySpec::new("units", ValueType::Text),
    PropertySpec::new("constant", ValueType::Bool),
];

const EVENT_PROPERTIES: &[PropertySpec] = &[PropertySpec::with_default(
    "useValuesFromTriggerTime",
    ValueType::Bool,
    DefaultValue::Bool(true),
)];

const EVENT_ASSIGNMENT_PROPERTIES: &[PropertySpec] =
    &[PropertySpec::new("variable", ValueType::Text)];

/// Payload of a node beyond its properties
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Element,
    ListOf(ListOf),
}

/// One element of the document tree
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) kind: ElementKind,
    pub(crate) element_name: String,
    pub(crate) package_name: Option<String>,
    pub(crate) package_version: i32,
    pub(crate) namespace_uri: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) extensions: IndexMap<String, Plugin>,
    /// Explicitly set properties keyed by schema name
    pub(crate) values: IndexMap<&'static str, PropertyValue>,
    pub(crate) data: NodeData,
}

impl Node {
    pub(crate) fn new(kind: ElementKind, namespace_uri: String) -> Self {
        Self {
            kind,
            element_name: kind.element_name().to_string(),
            package_name: kind.package_name().map(str::to_string),
            package_version: if kind.package_name().is_some() { 1 } else { -1 },
            namespace_uri,
            parent: None,
            children: Vec::new(),
            extensions: IndexMap::new(),
            values: IndexMap::new(),
            data: NodeData::Element,
        }
    }

    /// Container node; package ownership is filled in by the caller
    pub(crate) fn new_list(list: ListOf, namespace_uri: String) -> Self {
        let mut node = Self::new(ElementKind::ListOf, namespace_uri);
        node.element_name = list.list_type().element_name().to_string();
        node.data = NodeData::ListOf(list);
        node
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    /// Owning package; `None` is core
    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_deref()
    }

    /// Package schema revision, -1 when unspecified
    pub fn package_version(&self) -> i32 {
        self.package_version
    }

    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Own children in document order (plugin containers excluded)
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Attached plugins keyed by namespace, in attachment order
    pub fn extensions(&self) -> &IndexMap<String, Plugin> {
        &self.extensions
    }

    pub fn list(&self) -> Option<&ListOf> {
        match &self.data {
            NodeData::ListOf(list) => Some(list),
            NodeData::Element => None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.list().is_some()
    }

    pub fn id(&self) -> Option<&str> {
        self.text("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    pub fn metaid(&self) -> Option<&str> {
        self.text("metaid")
    }

    /// Explicitly set value, if any
    pub fn value(&self, property: &str) -> Option<&PropertyValue> {
        self.values.get(property)
    }

    fn text(&self, property: &str) -> Option<&str> {
        self.values.get(property).and_then(PropertyValue::as_text)
    }

    /// Label used in log records: `kind 'id'` or just the element name
    pub(crate) fn describe(&self) -> String {
        match self.id() {
            Some(id) => format!("{} '{id}'", self.element_name),
            None => self.element_name.clone(),
        }
    }
}

/// `create` + capitalized element name
pub fn factory_method_name(element_name: &str) -> String {
    format!("create{}", capitalize(element_name))
}

/// Upper-case the first character
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
