//! Conversion between typed property values and directory wire values.
//!
//! Each attribute syntax has a [`SyntaxConverter`]: a stateless pair of
//! functions between a wire representation (text or bytes) and a typed
//! value. The mapper works with the type-erased [`Converter`] view, which
//! every syntax converter gets for free.

mod syntaxes;

pub use syntaxes::{
    BinaryStringConverter, BooleanConverter, DirectoryStringConverter, DnConverter,
    GeneralizedTimeConverter, IntegerConverter, OctetStringConverter,
};

use crate::error::{ConversionError, MappingError};
use crate::value::{Value, ValueType};
use chrono::{DateTime, Utc};
use dirodm_proto::{Dn, RawValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Attribute syntaxes understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    DirectoryString,
    Integer,
    Boolean,
    OctetString,
    /// Text carried as raw bytes on the wire.
    BinaryString,
    GeneralizedTime,
    DistinguishedName,
}

impl Syntax {
    /// The syntax's LDAP object identifier.
    pub fn oid(&self) -> &'static str {
        match self {
            Syntax::DirectoryString => "1.3.6.1.4.1.1466.115.121.1.15",
            Syntax::Integer => "1.3.6.1.4.1.1466.115.121.1.27",
            Syntax::Boolean => "1.3.6.1.4.1.1466.115.121.1.7",
            Syntax::OctetString | Syntax::BinaryString => "1.3.6.1.4.1.1466.115.121.1.40",
            Syntax::GeneralizedTime => "1.3.6.1.4.1.1466.115.121.1.24",
            Syntax::DistinguishedName => "1.3.6.1.4.1.1466.115.121.1.12",
        }
    }

    /// The syntax used for a property type when none is declared.
    pub fn default_for(value_type: &ValueType) -> Syntax {
        match value_type {
            ValueType::Integer => Syntax::Integer,
            ValueType::Boolean => Syntax::Boolean,
            ValueType::Binary => Syntax::OctetString,
            ValueType::Timestamp => Syntax::GeneralizedTime,
            ValueType::Dn | ValueType::Reference(_) => Syntax::DistinguishedName,
            ValueType::String | ValueType::List => Syntax::DirectoryString,
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Syntax::DirectoryString => "DirectoryString",
            Syntax::Integer => "Integer",
            Syntax::Boolean => "Boolean",
            Syntax::OctetString => "OctetString",
            Syntax::BinaryString => "BinaryString",
            Syntax::GeneralizedTime => "GeneralizedTime",
            Syntax::DistinguishedName => "DistinguishedName",
        };
        f.write_str(name)
    }
}

/// A typed, stateless conversion for one syntax.
pub trait SyntaxConverter: Send + Sync {
    /// Wire representation (`String` or `Vec<u8>`).
    type Wire: WireValue;
    /// Property-side representation.
    type Value: TypedValue;

    const SYNTAX: Syntax;

    fn to_wire(&self, value: Self::Value) -> Result<Self::Wire, ConversionError>;

    fn from_wire(&self, wire: Self::Wire) -> Result<Self::Value, ConversionError>;
}

/// Type-erased converter used by the mapper.
pub trait Converter: Send + Sync {
    fn syntax(&self) -> Syntax;

    /// Encode a value; null encodes to nothing.
    fn to_directory(&self, value: &Value) -> Result<Option<RawValue>, ConversionError>;

    /// Decode one wire value.
    fn from_directory(&self, raw: &RawValue) -> Result<Value, ConversionError>;
}

impl<C: SyntaxConverter> Converter for C {
    fn syntax(&self) -> Syntax {
        C::SYNTAX
    }

    fn to_directory(&self, value: &Value) -> Result<Option<RawValue>, ConversionError> {
        if value.is_null() {
            return Ok(None);
        }
        let typed = C::Value::from_value(value).ok_or_else(|| ConversionError::Unsupported {
            syntax: C::SYNTAX,
            actual: value.value_type().unwrap_or(ValueType::List),
        })?;
        Ok(Some(self.to_wire(typed)?.into_raw()))
    }

    fn from_directory(&self, raw: &RawValue) -> Result<Value, ConversionError> {
        let wire = C::Wire::from_raw(raw, C::SYNTAX)?;
        Ok(self.from_wire(wire)?.into_value())
    }
}

/// A wire representation a converter can produce.
pub trait WireValue: Sized {
    fn into_raw(self) -> RawValue;
    fn from_raw(raw: &RawValue, syntax: Syntax) -> Result<Self, ConversionError>;
}

impl WireValue for String {
    fn into_raw(self) -> RawValue {
        RawValue::Text(self)
    }

    fn from_raw(raw: &RawValue, syntax: Syntax) -> Result<Self, ConversionError> {
        raw.as_text()
            .map(str::to_string)
            .ok_or_else(|| ConversionError::Malformed {
                syntax,
                value: hex::encode(raw.as_bytes()),
                reason: "not valid UTF-8".to_string(),
            })
    }
}

impl WireValue for Vec<u8> {
    fn into_raw(self) -> RawValue {
        RawValue::Binary(self)
    }

    fn from_raw(raw: &RawValue, _syntax: Syntax) -> Result<Self, ConversionError> {
        Ok(raw.as_bytes().to_vec())
    }
}

/// A property-side representation a converter can produce.
pub trait TypedValue: Sized {
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
}

impl TypedValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl TypedValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_integer()
    }
}

impl TypedValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_boolean()
    }
}

impl TypedValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Binary(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Binary(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl TypedValue for DateTime<Utc> {
    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl TypedValue for Dn {
    fn into_value(self) -> Value {
        Value::Dn(self)
    }

    /// References encode as the name they point to.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Dn(dn) => Some(dn.clone()),
            Value::Reference(r) => Some(r.dn.clone()),
            _ => None,
        }
    }
}

/// The converters available to a session factory, keyed by syntax.
#[derive(Clone)]
pub struct ConverterSet {
    converters: HashMap<Syntax, Arc<dyn Converter>>,
}

impl ConverterSet {
    /// An empty set.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// All built-in converters.
    pub fn standard() -> Self {
        Self::empty()
            .with(DirectoryStringConverter)
            .with(IntegerConverter)
            .with(BooleanConverter)
            .with(OctetStringConverter)
            .with(BinaryStringConverter)
            .with(GeneralizedTimeConverter)
            .with(DnConverter)
    }

    /// Install a converter, replacing any previous one for its syntax.
    pub fn with(mut self, converter: impl Converter + 'static) -> Self {
        self.register(Arc::new(converter));
        self
    }

    pub fn register(&mut self, converter: Arc<dyn Converter>) {
        self.converters.insert(converter.syntax(), converter);
    }

    /// The converter for a syntax.
    pub fn get(&self, syntax: Syntax) -> Result<&Arc<dyn Converter>, MappingError> {
        self.converters
            .get(&syntax)
            .ok_or(MappingError::NoConverter(syntax))
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl Default for ConverterSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ConverterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut syntaxes: Vec<_> = self.converters.keys().map(ToString::to_string).collect();
        syntaxes.sort();
        f.debug_struct("ConverterSet")
            .field("syntaxes", &syntaxes)
            .finish()
    }
}
