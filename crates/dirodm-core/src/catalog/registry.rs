//! Registry of persistent types.

use super::class::ClassMetadata;
use super::declaration::ClassDeclaration;
use super::persistent::Persistent;
use crate::error::MappingError;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// All persistent types known to a session factory.
///
/// Built once, immutable afterwards, shared by sessions.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: HashMap<String, Arc<ClassMetadata>>,
    by_object_classes: HashMap<BTreeSet<String>, String>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Get metadata by type name.
    pub fn get(&self, type_name: &str) -> Result<&Arc<ClassMetadata>, MappingError> {
        self.types
            .get(type_name)
            .ok_or_else(|| MappingError::UnknownType(type_name.to_string()))
    }

    /// Get metadata for a typed persistent class.
    pub fn get_for<T: Persistent>(&self) -> Result<&Arc<ClassMetadata>, MappingError> {
        self.get(T::type_name())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Find the most specific type for an entry's object classes.
    ///
    /// Among types whose object classes are all present, the one declaring the
    /// most classes wins; equally specific candidates are ordered by name.
    pub fn resolve<S: AsRef<str>>(&self, object_classes: &[S]) -> Result<&Arc<ClassMetadata>, MappingError> {
        let entry: BTreeSet<String> = object_classes
            .iter()
            .map(|c| c.as_ref().to_ascii_lowercase())
            .collect();

        if let Some(name) = self.by_object_classes.get(&entry) {
            return self.get(name);
        }

        self.types
            .values()
            .filter(|md| md.object_class_set().is_subset(&entry))
            .max_by(|a, b| {
                a.object_classes()
                    .len()
                    .cmp(&b.object_classes().len())
                    .then_with(|| b.type_name().cmp(a.type_name()))
            })
            .ok_or_else(|| {
                MappingError::UnknownObjectClasses(
                    object_classes.iter().map(|c| c.as_ref().to_string()).collect(),
                )
            })
    }

    /// Check if `sub` is `sup` or one of its subtypes.
    ///
    /// A subtype declares every object class of its supertype.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        match (self.types.get(sub), self.types.get(sup)) {
            (Some(sub), Some(sup)) => sup.object_class_set().is_subset(&sub.object_class_set()),
            _ => false,
        }
    }
}

/// Collects type metadata and validates it as a whole.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<ClassMetadata>,
}

impl RegistryBuilder {
    /// Register a typed persistent class.
    pub fn register<T: Persistent>(self) -> Result<Self, MappingError> {
        let metadata = T::metadata()?;
        if metadata.type_name() != T::type_name() {
            return Err(MappingError::InvalidDeclaration {
                type_name: T::type_name().to_string(),
                reason: format!("metadata describes {}", metadata.type_name()),
            });
        }
        Ok(self.with_metadata(metadata))
    }

    /// Register a declaration loaded from configuration.
    pub fn declare(self, declaration: ClassDeclaration) -> Result<Self, MappingError> {
        Ok(self.with_metadata(declaration.into_metadata()?))
    }

    /// Register prebuilt metadata.
    pub fn with_metadata(mut self, metadata: ClassMetadata) -> Self {
        self.types.push(metadata);
        self
    }

    /// Validate and build the registry.
    ///
    /// Rejects duplicate names, duplicate object-class sets and references
    /// to unregistered types.
    pub fn build(self) -> Result<Registry, MappingError> {
        let mut registry = Registry::default();

        for metadata in self.types {
            let name = metadata.type_name().to_string();
            if registry.types.contains_key(&name) {
                return Err(MappingError::DuplicateType(name));
            }
            let classes = metadata.object_class_set();
            if let Some(existing) = registry.by_object_classes.get(&classes) {
                return Err(MappingError::DuplicateObjectClasses {
                    type_name: name,
                    existing: existing.clone(),
                });
            }
            registry.by_object_classes.insert(classes, name.clone());
            registry.types.insert(name, Arc::new(metadata));
        }

        for metadata in registry.types.values() {
            for attr in metadata.attributes() {
                if let Some(target) = attr.reference_target() {
                    if !registry.types.contains_key(target) {
                        return Err(MappingError::UnknownReference {
                            type_name: metadata.type_name().to_string(),
                            property: attr.property_name.clone(),
                            target: target.to_string(),
                        });
                    }
                }
            }
        }

        tracing::debug!(types = registry.types.len(), "built type registry");
        Ok(registry)
    }
}
