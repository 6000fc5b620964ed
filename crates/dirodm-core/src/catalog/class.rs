//! Class metadata: the mapping of one persistent type.

use super::attribute::AttributeMetadata;
use crate::error::MappingError;
use dirodm_proto::OBJECT_CLASS;
use std::collections::{BTreeSet, HashMap};

/// Object class every entry carries.
pub const TOP: &str = "top";

/// Default name of the identifier property.
pub const DEFAULT_IDENTIFIER: &str = "dn";

/// How a persistent type maps onto directory entries.
///
/// Immutable once built; shared by the registry and every builder it hands out.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetadata {
    type_name: String,
    identifier: String,
    object_classes: Vec<String>,
    attributes: Vec<AttributeMetadata>,
    by_property: HashMap<String, usize>,
    by_attribute: HashMap<String, usize>,
}

impl ClassMetadata {
    /// Start building metadata for a type.
    pub fn builder(type_name: impl Into<String>) -> ClassMetadataBuilder {
        ClassMetadataBuilder {
            type_name: type_name.into(),
            identifier: DEFAULT_IDENTIFIER.to_string(),
            object_classes: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Name of the property holding the entry's distinguished name.
    pub fn identifier_property(&self) -> &str {
        &self.identifier
    }

    /// Object classes, `top` first, in declaration order.
    pub fn object_classes(&self) -> &[String] {
        &self.object_classes
    }

    /// Lowercased object classes for subset tests.
    pub fn object_class_set(&self) -> BTreeSet<String> {
        self.object_classes
            .iter()
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }

    /// Attribute mappings in declaration order.
    pub fn attributes(&self) -> &[AttributeMetadata] {
        &self.attributes
    }

    /// Look up a mapping by property name.
    pub fn attribute(&self, property: &str) -> Option<&AttributeMetadata> {
        self.by_property.get(property).map(|&i| &self.attributes[i])
    }

    /// Look up a mapping by directory attribute name (case-insensitive).
    pub fn attribute_by_name(&self, attribute: &str) -> Option<&AttributeMetadata> {
        self.by_attribute
            .get(&attribute.to_ascii_lowercase())
            .map(|&i| &self.attributes[i])
    }

    /// Like [`attribute`](Self::attribute) but fails for unknown properties.
    pub fn require(&self, property: &str) -> Result<&AttributeMetadata, MappingError> {
        self.attribute(property)
            .ok_or_else(|| MappingError::UnknownProperty {
                type_name: self.type_name.clone(),
                property: property.to_string(),
            })
    }

    /// Check if every object class of this type appears in `classes`.
    pub fn is_mapped_by<S: AsRef<str>>(&self, classes: &[S]) -> bool {
        self.object_classes
            .iter()
            .all(|own| classes.iter().any(|c| c.as_ref().eq_ignore_ascii_case(own)))
    }

    /// Names of the attributes a search needs to return.
    pub fn attribute_names(&self) -> Vec<String> {
        std::iter::once(OBJECT_CLASS.to_string())
            .chain(self.attributes.iter().map(|a| a.attribute_name.clone()))
            .collect()
    }
}

/// Builder for [`ClassMetadata`].
#[derive(Debug, Clone)]
pub struct ClassMetadataBuilder {
    type_name: String,
    identifier: String,
    object_classes: Vec<String>,
    attributes: Vec<AttributeMetadata>,
}

impl ClassMetadataBuilder {
    /// Name the identifier property (defaults to `dn`).
    pub fn identifier(mut self, property: impl Into<String>) -> Self {
        self.identifier = property.into();
        self
    }

    pub fn object_class(mut self, class: impl Into<String>) -> Self {
        self.object_classes.push(class.into());
        self
    }

    pub fn object_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_classes.extend(classes.into_iter().map(Into::into));
        self
    }

    pub fn attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attributes(mut self, attributes: impl IntoIterator<Item = AttributeMetadata>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// Validate and build.
    ///
    /// `top` is added when missing; duplicate object classes collapse.
    pub fn build(self) -> Result<ClassMetadata, MappingError> {
        let type_name = self.type_name;
        if type_name.trim().is_empty() {
            return Err(invalid(&type_name, "empty type name".to_string()));
        }

        let declared: Vec<String> = self
            .object_classes
            .into_iter()
            .filter(|c| !c.eq_ignore_ascii_case(TOP))
            .collect();
        if declared.is_empty() {
            return Err(MappingError::NoObjectClasses(type_name));
        }
        let mut object_classes = vec![TOP.to_string()];
        for class in declared {
            if !object_classes.iter().any(|c| c.eq_ignore_ascii_case(&class)) {
                object_classes.push(class);
            }
        }

        let mut by_property = HashMap::new();
        let mut by_attribute = HashMap::new();
        for (i, attr) in self.attributes.iter().enumerate() {
            if attr.property_name == self.identifier {
                return Err(invalid(
                    &type_name,
                    format!("property {} collides with the identifier", attr.property_name),
                ));
            }
            if attr.attribute_name.eq_ignore_ascii_case(OBJECT_CLASS) {
                return Err(invalid(
                    &type_name,
                    format!(
                        "property {} maps the reserved attribute {}",
                        attr.property_name, OBJECT_CLASS
                    ),
                ));
            }
            if by_property.insert(attr.property_name.clone(), i).is_some() {
                return Err(MappingError::DuplicateProperty {
                    type_name,
                    property: attr.property_name.clone(),
                });
            }
            if by_attribute
                .insert(attr.attribute_name.to_ascii_lowercase(), i)
                .is_some()
            {
                return Err(MappingError::DuplicateAttribute {
                    type_name,
                    attribute: attr.attribute_name.clone(),
                });
            }
        }

        Ok(ClassMetadata {
            type_name,
            identifier: self.identifier,
            object_classes,
            attributes: self.attributes,
            by_property,
            by_attribute,
        })
    }
}

fn invalid(type_name: &str, reason: String) -> MappingError {
    MappingError::InvalidDeclaration {
        type_name: type_name.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> ClassMetadata {
        ClassMetadata::builder("Person")
            .object_class("person")
            .attribute(AttributeMetadata::string("commonName", "cn"))
            .attribute(AttributeMetadata::string("surname", "sn"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_top_is_implicit() {
        let md = person();
        assert_eq!(md.object_classes(), &["top".to_string(), "person".to_string()]);

        let explicit = ClassMetadata::builder("Person")
            .object_classes(["person", "TOP", "Person"])
            .build()
            .unwrap();
        assert_eq!(explicit.object_classes().len(), 2);
    }

    #[test]
    fn test_lookups() {
        let md = person();
        assert_eq!(md.attribute("surname").unwrap().attribute_name, "sn");
        assert_eq!(md.attribute_by_name("CN").unwrap().property_name, "commonName");
        assert!(md.attribute("age").is_none());
        assert!(matches!(
            md.require("age"),
            Err(MappingError::UnknownProperty { .. })
        ));
        assert_eq!(md.identifier_property(), "dn");
        assert_eq!(md.attribute_names(), vec!["objectClass", "cn", "sn"]);
    }

    #[test]
    fn test_is_mapped_by() {
        let md = person();
        assert!(md.is_mapped_by(&["top", "Person", "inetOrgPerson"]));
        assert!(!md.is_mapped_by(&["top"]));
    }

    #[test]
    fn test_rejects_bad_declarations() {
        assert!(matches!(
            ClassMetadata::builder("Empty").object_class("top").build(),
            Err(MappingError::NoObjectClasses(_))
        ));
        assert!(matches!(
            ClassMetadata::builder("Person")
                .object_class("person")
                .attribute(AttributeMetadata::string("cn", "cn"))
                .attribute(AttributeMetadata::string("cn", "commonName"))
                .build(),
            Err(MappingError::DuplicateProperty { .. })
        ));
        assert!(matches!(
            ClassMetadata::builder("Person")
                .object_class("person")
                .attribute(AttributeMetadata::string("a", "cn"))
                .attribute(AttributeMetadata::string("b", "CN"))
                .build(),
            Err(MappingError::DuplicateAttribute { .. })
        ));
        assert!(matches!(
            ClassMetadata::builder("Person")
                .object_class("person")
                .attribute(AttributeMetadata::string("classes", "objectClass"))
                .build(),
            Err(MappingError::InvalidDeclaration { .. })
        ));
    }
}
