//! Persistent types and their dynamic form.

use super::class::ClassMetadata;
use crate::error::{ConversionError, MappingError};
use crate::value::{Properties, Reference, Value};
use dirodm_proto::Dn;

/// A type whose instances live as directory entries.
///
/// Implementations describe their mapping once through [`metadata`](Self::metadata)
/// and move their state in and out of [`Properties`]. Unknown properties must be
/// ignored by [`from_properties`](Self::from_properties): a search for a type also
/// returns its subtypes, which carry more properties.
pub trait Persistent: Sized {
    /// Registered type name.
    fn type_name() -> &'static str;

    /// Class metadata for this type.
    fn metadata() -> Result<ClassMetadata, MappingError>;

    /// The instance's distinguished name, if assigned.
    fn dn(&self) -> Option<&Dn>;

    fn set_dn(&mut self, dn: Dn);

    /// Current property values; absent means null.
    fn to_properties(&self) -> Properties;

    /// Rebuild an instance from decoded properties.
    fn from_properties(properties: Properties) -> Result<Self, ConversionError>;

    /// A reference to this instance.
    fn reference(&self) -> Result<Reference, MappingError> {
        self.dn()
            .map(|dn| Reference::new(Self::type_name(), dn.clone()))
            .ok_or_else(|| MappingError::MissingIdentifier(Self::type_name().to_string()))
    }
}

/// A persistent instance in dynamic form: type name, name and properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub dn: Dn,
    pub properties: Properties,
}

impl Record {
    pub fn new(type_name: impl Into<String>, dn: Dn) -> Self {
        Self {
            type_name: type_name.into(),
            dn,
            properties: Properties::new(),
        }
    }

    /// Set a property (builder form).
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.set(property, value);
        self
    }

    /// Capture a typed instance.
    pub fn from_persistent<T: Persistent>(instance: &T) -> Result<Self, MappingError> {
        let dn = instance
            .dn()
            .cloned()
            .ok_or_else(|| MappingError::MissingIdentifier(T::type_name().to_string()))?;
        Ok(Self {
            type_name: T::type_name().to_string(),
            dn,
            properties: instance.to_properties(),
        })
    }

    /// Rebuild a typed instance.
    pub fn into_persistent<T: Persistent>(self) -> Result<T, ConversionError> {
        let mut instance = T::from_properties(self.properties)?;
        instance.set_dn(self.dn);
        Ok(instance)
    }

    /// Get a property value, null when absent.
    pub fn get(&self, property: &str) -> &Value {
        self.properties.value(property)
    }

    pub fn reference(&self) -> Reference {
        Reference::new(self.type_name.clone(), self.dn.clone())
    }
}
