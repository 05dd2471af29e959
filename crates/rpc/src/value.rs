//! Declared parameter types and the typed values bound to them.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Scalar type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Int,
    Long,
    Float,
    Bool,
    String,
}

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Long => "long",
            ParamType::Float => "float",
            ParamType::Bool => "boolean",
            ParamType::String => "string",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bound argument.
///
/// `Null` fills optional parameters that received no value and have no default, and
/// plugin-injected slots before the plugin writes them.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamValue {
    #[default]
    Null,
    Int(i32),
    Long(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl ParamValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    pub fn param_type(&self) -> Option<ParamType> {
        match self {
            ParamValue::Null => None,
            ParamValue::Int(_) => Some(ParamType::Int),
            ParamValue::Long(_) => Some(ParamType::Long),
            ParamValue::Float(_) => Some(ParamType::Float),
            ParamValue::Bool(_) => Some(ParamType::Bool),
            ParamValue::String(_) => Some(ParamType::String),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Null => Value::Null,
            ParamValue::Int(v) => Value::from(*v),
            ParamValue::Long(v) => Value::from(*v),
            ParamValue::Float(v) => Value::from(*v),
            ParamValue::Bool(v) => Value::from(*v),
            ParamValue::String(v) => Value::from(v.as_str()),
        }
    }
}

macro_rules! param_value_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for ParamValue {
            #[inline]
            fn from(value: $ty) -> Self {
                ParamValue::$variant(value.into())
            }
        }
    };
}

param_value_from!(i32, Int);
param_value_from!(i64, Long);
param_value_from!(f64, Float);
param_value_from!(bool, Bool);
param_value_from!(String, String);
param_value_from!(&str, String);

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Null => f.write_str("null"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Long(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::String(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(ParamValue::from(1), ParamValue::Int(1));
        assert_eq!(ParamValue::from(1_i64), ParamValue::Long(1));
        assert_eq!(ParamValue::from("a"), ParamValue::String("a".into()));
        assert_eq!(ParamValue::from(false).param_type(), Some(ParamType::Bool));
        assert!(ParamValue::default().is_null());
    }

    #[test]
    fn type_names() {
        assert_eq!(ParamType::Bool.to_string(), "boolean");
        let parsed: ParamType = serde_json::from_str("\"long\"").unwrap();
        assert_eq!(parsed, ParamType::Long);
    }

    #[test]
    fn json_view() {
        assert_eq!(ParamValue::Int(3).to_json(), serde_json::json!(3));
        assert_eq!(ParamValue::Null.to_json(), Value::Null);
    }
}
