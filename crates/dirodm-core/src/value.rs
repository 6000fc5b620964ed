//! Typed property values carried between persistent types and the mapper.

use crate::error::ConversionError;
use chrono::{DateTime, SecondsFormat, Utc};
use dirodm_proto::Dn;
use std::collections::BTreeMap;
use std::fmt;

/// Declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Boolean,
    Binary,
    Timestamp,
    Dn,
    /// Reference to an instance of the named persistent type.
    Reference(String),
    List,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Integer => write!(f, "integer"),
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Binary => write!(f, "binary"),
            ValueType::Timestamp => write!(f, "timestamp"),
            ValueType::Dn => write!(f, "dn"),
            ValueType::Reference(target) => write!(f, "reference to {}", target),
            ValueType::List => write!(f, "list"),
        }
    }
}

/// A reference to another persistent instance by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub type_name: String,
    pub dn: Dn,
}

impl Reference {
    pub fn new(type_name: impl Into<String>, dn: Dn) -> Self {
        Self {
            type_name: type_name.into(),
            dn,
        }
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Integer(i64),
    Boolean(bool),
    Binary(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Dn(Dn),
    Reference(Reference),
    /// Values of a multivalued property.
    List(Vec<Value>),
}

impl Value {
    /// The runtime type, `None` for null.
    pub fn value_type(&self) -> Option<ValueType> {
        Some(match self {
            Value::Null => return None,
            Value::String(_) => ValueType::String,
            Value::Integer(_) => ValueType::Integer,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Binary(_) => ValueType::Binary,
            Value::Timestamp(_) => ValueType::Timestamp,
            Value::Dn(_) => ValueType::Dn,
            Value::Reference(r) => ValueType::Reference(r.type_name.clone()),
            Value::List(_) => ValueType::List,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(values) => Some(values),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Binary(b) => f.write_str(&hex::encode(b)),
            Value::Timestamp(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Dn(dn) => write!(f, "{}", dn),
            Value::Reference(r) => write!(f, "{}", r.dn),
            Value::List(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                Ok(())
            }
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Dn> for Value {
    fn from(v: Dn) -> Self {
        Value::Dn(v)
    }
}

impl From<Reference> for Value {
    fn from(v: Reference) -> Self {
        Value::Reference(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List(v.into_iter().map(Value::String).collect())
    }
}

impl From<Vec<Reference>> for Value {
    fn from(v: Vec<Reference>) -> Self {
        Value::List(v.into_iter().map(Value::Reference).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Named property values of one instance.
///
/// Absent and null properties are equivalent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    values: BTreeMap<String, Value>,
}

macro_rules! take_scalar {
    ($name:ident, $variant:ident, $ty:ty, $value_type:expr) => {
        #[doc = concat!("Remove a property expected to hold `", stringify!($ty), "`.")]
        pub fn $name(&mut self, property: &str) -> Result<Option<$ty>, ConversionError> {
            match self.take(property) {
                Value::Null => Ok(None),
                Value::$variant(v) => Ok(Some(v)),
                other => Err(wrong_type(property, $value_type, &other)),
            }
        }
    };
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property (builder form).
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(property, value);
        self
    }

    /// Set a property; null removes it.
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<Value>) {
        let property = property.into();
        match value.into() {
            Value::Null => {
                self.values.remove(&property);
            }
            value => {
                self.values.insert(property, value);
            }
        }
    }

    /// Get a property, `None` when absent or null.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    /// Get a property, null when absent.
    pub fn value(&self, property: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(property).unwrap_or(&NULL)
    }

    /// Remove a property, null when absent.
    pub fn take(&mut self, property: &str) -> Value {
        self.values.remove(property).unwrap_or(Value::Null)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    take_scalar!(take_string, String, String, ValueType::String);
    take_scalar!(take_integer, Integer, i64, ValueType::Integer);
    take_scalar!(take_boolean, Boolean, bool, ValueType::Boolean);
    take_scalar!(take_binary, Binary, Vec<u8>, ValueType::Binary);
    take_scalar!(take_timestamp, Timestamp, DateTime<Utc>, ValueType::Timestamp);
    take_scalar!(take_dn, Dn, Dn, ValueType::Dn);

    /// Remove a reference property.
    pub fn take_reference(&mut self, property: &str) -> Result<Option<Reference>, ConversionError> {
        match self.take(property) {
            Value::Null => Ok(None),
            Value::Reference(r) => Ok(Some(r)),
            other => Err(wrong_type(
                property,
                ValueType::Reference(String::new()),
                &other,
            )),
        }
    }

    /// Remove a required string property.
    pub fn require_string(&mut self, property: &str) -> Result<String, ConversionError> {
        self.take_string(property)?
            .ok_or_else(|| ConversionError::MissingValue(property.to_string()))
    }

    /// Remove a multivalued string property; null yields an empty list.
    pub fn take_strings(&mut self, property: &str) -> Result<Vec<String>, ConversionError> {
        self.take_list(property)?
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                other => Err(wrong_type(property, ValueType::String, &other)),
            })
            .collect()
    }

    /// Remove a multivalued reference property; null yields an empty list.
    pub fn take_references(&mut self, property: &str) -> Result<Vec<Reference>, ConversionError> {
        self.take_list(property)?
            .into_iter()
            .map(|v| match v {
                Value::Reference(r) => Ok(r),
                other => Err(wrong_type(
                    property,
                    ValueType::Reference(String::new()),
                    &other,
                )),
            })
            .collect()
    }

    fn take_list(&mut self, property: &str) -> Result<Vec<Value>, ConversionError> {
        match self.take(property) {
            Value::Null => Ok(Vec::new()),
            Value::List(values) => Ok(values),
            other => Err(wrong_type(property, ValueType::List, &other)),
        }
    }
}

impl FromIterator<(String, Value)> for Properties {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for (k, v) in iter {
            properties.set(k, v);
        }
        properties
    }
}

fn wrong_type(property: &str, expected: ValueType, actual: &Value) -> ConversionError {
    ConversionError::WrongType {
        property: property.to_string(),
        expected,
        actual: actual.value_type().unwrap_or(ValueType::List),
    }
}
