//! Core error types.

use crate::convert::Syntax;
use crate::filter::Comparison;
use crate::value::ValueType;
use dirodm_proto::{DirectoryError, Dn};
use thiserror::Error;

/// Configuration-time misuse of the metadata model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// The type has no class metadata.
    #[error("{0} is not a persistent type")]
    UnknownType(String),

    /// The type has no such property.
    #[error("property {property} not found in {type_name}")]
    UnknownProperty { type_name: String, property: String },

    /// No registered type's object classes are a subset of the entry's.
    #[error("no persistent type matches object classes [{}]", .0.join(", "))]
    UnknownObjectClasses(Vec<String>),

    /// A type name was registered twice.
    #[error("type {0} is already registered")]
    DuplicateType(String),

    /// Two types declare the same object-class set.
    #[error("{type_name} declares the same object classes as {existing}")]
    DuplicateObjectClasses { type_name: String, existing: String },

    /// A property is declared twice.
    #[error("property {property} is declared twice in {type_name}")]
    DuplicateProperty { type_name: String, property: String },

    /// An attribute is mapped by two properties.
    #[error("attribute {attribute} is mapped twice in {type_name}")]
    DuplicateAttribute { type_name: String, attribute: String },

    /// The declaration names no object class.
    #[error("{0} declares no object classes")]
    NoObjectClasses(String),

    /// A reference property targets a type that was never registered.
    #[error("property {property} of {type_name} references unregistered type {target}")]
    UnknownReference {
        type_name: String,
        property: String,
        target: String,
    },

    /// No converter is installed for a syntax.
    #[error("no converter for syntax {0}")]
    NoConverter(Syntax),

    /// A record has no distinguished name.
    #[error("{0} instance has no identifier")]
    MissingIdentifier(String),

    /// Any other inconsistency in a declaration.
    #[error("invalid declaration of {type_name}: {reason}")]
    InvalidDeclaration { type_name: String, reason: String },
}

/// A value that cannot be encoded or decoded for its syntax or type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Wire value is not valid for the syntax.
    #[error("cannot decode '{value}' as {syntax}: {reason}")]
    Malformed {
        syntax: Syntax,
        value: String,
        reason: String,
    },

    /// Value has a different type than the property declares.
    #[error("wrong type ({actual}) for property {property}, expecting {expected}")]
    WrongType {
        property: String,
        expected: ValueType,
        actual: ValueType,
    },

    /// The converter cannot hold a value of this type.
    #[error("syntax {syntax} cannot hold a {actual} value")]
    Unsupported { syntax: Syntax, actual: ValueType },

    /// Ordering or approximate comparison against a missing value.
    #[error("cannot compare {attribute} {operator} null")]
    NullComparison {
        attribute: String,
        operator: Comparison,
    },

    /// A required property was absent.
    #[error("missing value for property {0}")]
    MissingValue(String),
}

/// Errors surfaced by the mapping engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Metadata misuse (unknown type or property, bad declaration).
    #[error("mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// A value could not be converted.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// The name is absent from the directory.
    #[error("entry not found: {0}")]
    NotFound(Dn),

    /// The directory truncated the result set.
    #[error("size limit of {limit} entries exceeded")]
    SizeLimitExceeded { limit: u32 },

    /// Any other transport failure, passed through unchanged.
    #[error("directory error: {0}")]
    Directory(DirectoryError),

    /// Malformed name or scope.
    #[error("protocol error: {0}")]
    Protocol(#[from] dirodm_proto::Error),

    /// Configuration or declaration file could not be read.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DirectoryError> for Error {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::NotFound(dn) => Error::NotFound(dn),
            DirectoryError::SizeLimitExceeded { limit } => Error::SizeLimitExceeded { limit },
            other => Error::Directory(other),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_errors_keep_their_kind() {
        let dn = Dn::parse("cn=missing,dc=example").unwrap();
        assert!(matches!(
            Error::from(DirectoryError::NotFound(dn.clone())),
            Error::NotFound(d) if d == dn
        ));
        assert!(matches!(
            Error::from(DirectoryError::SizeLimitExceeded { limit: 3 }),
            Error::SizeLimitExceeded { limit: 3 }
        ));
        assert!(matches!(
            Error::from(DirectoryError::Transport("timeout".into())),
            Error::Directory(DirectoryError::Transport(_))
        ));
    }

    #[test]
    fn test_messages() {
        let err = MappingError::UnknownProperty {
            type_name: "Person".into(),
            property: "age".into(),
        };
        assert_eq!(err.to_string(), "property age not found in Person");

        let err = ConversionError::WrongType {
            property: "commonName".into(),
            expected: ValueType::String,
            actual: ValueType::Integer,
        };
        assert_eq!(
            err.to_string(),
            "wrong type (integer) for property commonName, expecting string"
        );
    }
}
