//! Attribute metadata: how one property maps onto one directory attribute.

use crate::convert::Syntax;
use crate::value::ValueType;
use serde::{Deserialize, Serialize};

/// Whether a property holds one value or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Multivalued,
}

/// Mapping of a property onto a directory attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMetadata {
    /// Property name on the persistent type.
    pub property_name: String,
    /// Attribute name in the directory.
    pub attribute_name: String,
    /// Single or multivalued.
    pub cardinality: Cardinality,
    /// Declared type of each value.
    pub value_type: ValueType,
    /// Wire syntax used to encode values.
    pub syntax: Syntax,
}

impl AttributeMetadata {
    /// Create a single-valued mapping using the default syntax for the type.
    pub fn new(
        property_name: impl Into<String>,
        attribute_name: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            property_name: property_name.into(),
            attribute_name: attribute_name.into(),
            cardinality: Cardinality::Single,
            syntax: Syntax::default_for(&value_type),
            value_type,
        }
    }

    pub fn string(property_name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self::new(property_name, attribute_name, ValueType::String)
    }

    pub fn integer(property_name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self::new(property_name, attribute_name, ValueType::Integer)
    }

    pub fn boolean(property_name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self::new(property_name, attribute_name, ValueType::Boolean)
    }

    pub fn binary(property_name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self::new(property_name, attribute_name, ValueType::Binary)
    }

    pub fn timestamp(property_name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self::new(property_name, attribute_name, ValueType::Timestamp)
    }

    pub fn dn(property_name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self::new(property_name, attribute_name, ValueType::Dn)
    }

    /// A property holding references to instances of `target`.
    pub fn reference(
        property_name: impl Into<String>,
        attribute_name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::new(
            property_name,
            attribute_name,
            ValueType::Reference(target.into()),
        )
    }

    /// Make the property multivalued.
    pub fn multivalued(mut self) -> Self {
        self.cardinality = Cardinality::Multivalued;
        self
    }

    /// Override the wire syntax.
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn is_multivalued(&self) -> bool {
        self.cardinality == Cardinality::Multivalued
    }

    /// The referenced type, if this property holds references.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.value_type {
            ValueType::Reference(target) => Some(target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_syntax() {
        let attr = AttributeMetadata::integer("uid", "uidNumber");
        assert_eq!(attr.syntax, Syntax::Integer);
        assert!(!attr.is_multivalued());

        let attr = AttributeMetadata::string("password", "userPassword")
            .with_syntax(Syntax::BinaryString);
        assert_eq!(attr.syntax, Syntax::BinaryString);
        assert_eq!(attr.value_type, ValueType::String);
    }

    #[test]
    fn test_reference() {
        let attr = AttributeMetadata::reference("members", "member", "Person").multivalued();
        assert_eq!(attr.reference_target(), Some("Person"));
        assert_eq!(attr.syntax, Syntax::DistinguishedName);
        assert!(attr.is_multivalued());
        assert_eq!(AttributeMetadata::dn("manager", "manager").reference_target(), None);
    }
}
