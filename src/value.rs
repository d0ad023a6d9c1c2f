//! Dynamically-typed property values and their attribute encodings

use std::fmt;

use crate::error::{Error, Result};

/// Value of a node or plugin property
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl PropertyValue {
    /// Type name used in error messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Double(_) => "double",
            Self::Text(_) => "string",
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view; integers widen to double
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(n) => Some(*n),
            Self::Int(n) => i32::try_from(*n).ok().map(f64::from),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Identity used for change detection
    ///
    /// Doubles compare by representation, so `NaN` matches `NaN` and `0.0`
    /// differs from `-0.0`.
    pub fn is_same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Double(a), Self::Double(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            _ => self == other,
        }
    }
}

/// [`PropertyValue::is_same`] lifted to optional values
pub(crate) fn same_value(a: Option<&PropertyValue>, b: Option<&PropertyValue>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.is_same(b),
        (None, None) => true,
        _ => false,
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(n) => f.write_str(&format_double(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Declared type of a property
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Int,
    Double,
    Text,
    /// Text restricted to a closed vocabulary
    Enum(&'static [&'static str]),
}

impl ValueType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Double => "double",
            Self::Text => "string",
            Self::Enum(_) => "enumeration",
        }
    }

    /// Parse an attribute value of this type
    ///
    /// `attribute` and `element` only feed the error message.
    pub fn parse(self, value: &str, attribute: &str, element: &str) -> Result<PropertyValue> {
        match self {
            Self::Bool => parse_bool(value)
                .map(PropertyValue::Bool)
                .ok_or_else(|| Error::invalid_value(value, attribute, element, self.name())),
            Self::Int => value
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Int)
                .map_err(|_| Error::invalid_value(value, attribute, element, self.name())),
            Self::Double => parse_double(value)
                .map(PropertyValue::Double)
                .ok_or_else(|| Error::invalid_value(value, attribute, element, self.name())),
            Self::Text => Ok(PropertyValue::Text(value.to_string())),
            Self::Enum(vocabulary) => {
                if vocabulary.contains(&value) {
                    Ok(PropertyValue::Text(value.to_string()))
                } else {
                    Err(Error::invalid_enum(value, attribute, element))
                }
            }
        }
    }

    /// Check a programmatic value against this type
    pub fn accepts(self, value: &PropertyValue) -> bool {
        match (self, value) {
            (Self::Bool, PropertyValue::Bool(_))
            | (Self::Int, PropertyValue::Int(_))
            | (Self::Double, PropertyValue::Double(_))
            | (Self::Text, PropertyValue::Text(_)) => true,
            (Self::Enum(vocabulary), PropertyValue::Text(text)) => {
                vocabulary.contains(&text.as_str())
            }
            _ => false,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn parse_double(value: &str) -> Option<f64> {
    match value.trim() {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    }
}

fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        format!("{value:?}")
    }
}
