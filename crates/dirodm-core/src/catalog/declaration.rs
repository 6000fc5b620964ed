//! Serializable type declarations, for registries loaded from files.

use super::attribute::AttributeMetadata;
use super::class::{ClassMetadata, DEFAULT_IDENTIFIER};
use super::registry::Registry;
use crate::convert::Syntax;
use crate::error::{Error, MappingError};
use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Scalar property types in declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    String,
    Integer,
    Boolean,
    Binary,
    Timestamp,
    Dn,
}

impl From<DeclaredType> for ValueType {
    fn from(t: DeclaredType) -> Self {
        match t {
            DeclaredType::String => ValueType::String,
            DeclaredType::Integer => ValueType::Integer,
            DeclaredType::Boolean => ValueType::Boolean,
            DeclaredType::Binary => ValueType::Binary,
            DeclaredType::Timestamp => ValueType::Timestamp,
            DeclaredType::Dn => ValueType::Dn,
        }
    }
}

/// One property of a declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDeclaration {
    pub property: String,
    /// Directory attribute; defaults to the property name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<DeclaredType>,
    /// Target type of a reference property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub multivalued: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<Syntax>,
}

/// A persistent type declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDeclaration {
    pub name: String,
    #[serde(default = "default_identifier")]
    pub identifier: String,
    pub object_classes: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDeclaration>,
}

fn default_identifier() -> String {
    DEFAULT_IDENTIFIER.to_string()
}

impl ClassDeclaration {
    /// Validate and turn into class metadata.
    pub fn into_metadata(self) -> Result<ClassMetadata, MappingError> {
        let mut builder = ClassMetadata::builder(self.name.as_str())
            .identifier(self.identifier)
            .object_classes(self.object_classes);

        for decl in self.attributes {
            let value_type = match (decl.reference, decl.value_type) {
                (Some(target), None) => ValueType::Reference(target),
                (None, Some(t)) => t.into(),
                (Some(_), Some(_)) => {
                    return Err(MappingError::InvalidDeclaration {
                        type_name: self.name,
                        reason: format!("property {} has both a type and a reference", decl.property),
                    })
                }
                (None, None) => {
                    return Err(MappingError::InvalidDeclaration {
                        type_name: self.name,
                        reason: format!("property {} has no type", decl.property),
                    })
                }
            };
            let attribute = decl.attribute.unwrap_or_else(|| decl.property.clone());
            let mut metadata = AttributeMetadata::new(decl.property, attribute, value_type);
            if decl.multivalued {
                metadata = metadata.multivalued();
            }
            if let Some(syntax) = decl.syntax {
                metadata = metadata.with_syntax(syntax);
            }
            builder = builder.attribute(metadata);
        }

        builder.build()
    }
}

/// A set of declarations, as stored in a schema file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDeclaration {
    pub types: Vec<ClassDeclaration>,
}

impl SchemaDeclaration {
    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Build a registry holding every declared type.
    pub fn into_registry(self) -> Result<Registry, Error> {
        let mut builder = Registry::builder();
        for declaration in self.types {
            builder = builder.declare(declaration)?;
        }
        Ok(builder.build()?)
    }
}
