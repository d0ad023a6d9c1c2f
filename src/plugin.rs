//! Package plugins attached to host nodes

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Result};
use crate::package::{dynamic, multi};
use crate::tree::{ElementKind, NodeId, PropertySpec};
use crate::value::{PropertyValue, ValueType};

/// Closed set of plugin variants across the bundled packages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PluginKind {
    DynEvent,
    DynCompartment,
    DynSBase,
    MultiModel,
    MultiSpecies,
    MultiCompartment,
    MultiSBase,
}

impl PluginKind {
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::DynEvent => "DynEventPlugin",
            Self::DynCompartment => "DynCompartmentPlugin",
            Self::DynSBase => "DynSBasePlugin",
            Self::MultiModel => "MultiModelPlugin",
            Self::MultiSpecies => "MultiSpeciesPlugin",
            Self::MultiCompartment => "MultiCompartmentPlugin",
            Self::MultiSBase => "MultiSBasePlugin",
        }
    }

    pub const fn package_name(self) -> &'static str {
        match self {
            Self::DynEvent | Self::DynCompartment | Self::DynSBase => dynamic::PACKAGE_NAME,
            _ => multi::PACKAGE_NAME,
        }
    }

    /// Namespace of the package revision this plugin implements
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::DynEvent | Self::DynCompartment | Self::DynSBase => dynamic::NAMESPACE_L3V1V1,
            _ => multi::NAMESPACE_L3V1V1,
        }
    }

    pub const fn properties(self) -> &'static [PropertySpec] {
        match self {
            Self::DynEvent => dynamic::DYN_EVENT_PLUGIN_PROPERTIES,
            Self::DynCompartment | Self::DynSBase => dynamic::DYN_SBASE_PLUGIN_PROPERTIES,
            Self::MultiSpecies => multi::MULTI_SPECIES_PLUGIN_PROPERTIES,
            Self::MultiCompartment => multi::MULTI_COMPARTMENT_PLUGIN_PROPERTIES,
            Self::MultiModel | Self::MultiSBase => &[],
        }
    }

    pub fn property_spec(self, name: &str) -> Option<&'static PropertySpec> {
        self.properties().iter().find(|spec| spec.name == name)
    }

    /// Containers this plugin contributes: (element name, item kind)
    pub const fn lists(self) -> &'static [(&'static str, ElementKind)] {
        match self {
            Self::DynEvent => &[(dynamic::LIST_OF_DYN_ELEMENTS, ElementKind::DynElement)],
            Self::DynCompartment => &[(
                dynamic::LIST_OF_SPATIAL_COMPONENTS,
                ElementKind::SpatialComponent,
            )],
            Self::MultiModel => &[(multi::LIST_OF_SPECIES_TYPES, ElementKind::SpeciesType)],
            Self::MultiSpecies => &[(
                multi::LIST_OF_OUTWARD_BINDING_SITES,
                ElementKind::OutwardBindingSite,
            )],
            Self::DynSBase | Self::MultiCompartment | Self::MultiSBase => &[],
        }
    }

    pub fn list_item_kind(self, list_name: &str) -> Option<ElementKind> {
        self.lists()
            .iter()
            .find(|(name, _)| *name == list_name)
            .map(|(_, kind)| *kind)
    }
}

/// Extension attached to exactly one host under one namespace
#[derive(Clone, Debug, PartialEq)]
pub struct Plugin {
    pub(crate) namespace: String,
    pub(crate) package_name: String,
    pub(crate) package_version: i32,
    pub(crate) kind: PluginKind,
    pub(crate) values: IndexMap<&'static str, PropertyValue>,
    pub(crate) lists: IndexMap<String, NodeId>,
}

impl Plugin {
    pub fn new(kind: PluginKind) -> Self {
        Self {
            namespace: kind.namespace().to_string(),
            package_name: kind.package_name().to_string(),
            package_version: 1,
            kind,
            values: IndexMap::new(),
            lists: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    pub fn package_version(&self) -> i32 {
        self.package_version
    }

    /// Containers created so far, in creation order
    pub fn lists(&self) -> &IndexMap<String, NodeId> {
        &self.lists
    }

    pub fn list(&self, name: &str) -> Option<NodeId> {
        self.lists.get(name).copied()
    }

    /// Explicitly set value, if any
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    /// Set properties in schema order
    pub fn values(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> + '_ {
        self.kind
            .properties()
            .iter()
            .filter_map(|spec| self.values.get(spec.name).map(|value| (spec.name, value)))
    }

    /// Set a property without notifying anyone, returning the previous value
    ///
    /// Used to populate a plugin before it is attached; attached plugins go
    /// through [`Document::set_plugin_property`](crate::tree::Document::set_plugin_property).
    pub fn set_value(
        &mut self,
        name: &str,
        value: Option<PropertyValue>,
    ) -> Result<Option<PropertyValue>> {
        let spec = self.spec(name)?;
        match value {
            Some(value) => {
                if !spec.ty.accepts(&value) {
                    return Err(type_error(spec, &value, self.kind.type_name()));
                }
                Ok(self.values.insert(spec.name, value))
            }
            None => Ok(self.values.shift_remove(spec.name)),
        }
    }

    pub(crate) fn spec(&self, name: &str) -> Result<&'static PropertySpec> {
        self.kind.property_spec(name).ok_or_else(|| {
            Error::new(ErrorKind::UnknownProperty {
                property: name.to_string(),
                element: self.kind.type_name().to_string(),
            })
        })
    }
}

/// Error for a programmatic value that does not fit the declared type
pub(crate) fn type_error(spec: &PropertySpec, value: &PropertyValue, element: &str) -> Error {
    if let (ValueType::Enum(_), PropertyValue::Text(text)) = (spec.ty, value) {
        return Error::invalid_enum(text, spec.name, element);
    }
    Error::new(ErrorKind::TypeMismatch {
        property: spec.name.to_string(),
        expected: spec.ty.name(),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_plugin_defaults_from_kind() {
        let plugin = Plugin::new(PluginKind::DynEvent);
        assert_eq!(plugin.namespace(), dynamic::NAMESPACE_L3V1V1);
        assert_eq!(plugin.package_name(), "dyn");
        assert_eq!(
            PluginKind::DynEvent.list_item_kind("listOfDynElements"),
            Some(ElementKind::DynElement)
        );
        assert!(PluginKind::DynSBase.lists().is_empty());
    }

    #[test]
    fn test_set_value_checks_schema() {
        let mut plugin = Plugin::new(PluginKind::DynEvent);
        assert_eq!(
            plugin
                .set_value("applyToAll", Some(PropertyValue::Bool(true)))
                .unwrap(),
            None
        );
        assert_eq!(plugin.value("applyToAll"), Some(&PropertyValue::Bool(true)));

        let err = plugin
            .set_value("applyToAll", Some(PropertyValue::from("yes")))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::TypeMismatch { .. }));

        let err = plugin.set_value("isType", None).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::UnknownProperty { .. }));
    }
}
