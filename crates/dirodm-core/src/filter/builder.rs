//! Type-checked filter construction from property names and typed values.

use super::{absorb, escape_assertion_value, Comparison, Filter};
use crate::catalog::{AttributeMetadata, ClassMetadata, Registry};
use crate::convert::{Converter, ConverterSet};
use crate::error::{ConversionError, Error, MappingError};
use crate::value::{Reference, Value, ValueType};
use dirodm_proto::{Dn, RawValue, OBJECT_CLASS};
use std::fmt;
use std::sync::Arc;

/// Builds filters for one persistent type.
///
/// The root is a conjunction that starts with one `objectClass` equality per
/// object class of the type, so every filter it produces only selects entries
/// of that type (or its subtypes).
#[derive(Debug, Clone)]
pub struct FilterBuilder {
    registry: Arc<Registry>,
    converters: Arc<ConverterSet>,
    metadata: Arc<ClassMetadata>,
    root: Vec<Filter>,
}

impl FilterBuilder {
    /// Create a builder for a registered type.
    pub fn new(
        registry: Arc<Registry>,
        converters: Arc<ConverterSet>,
        type_name: &str,
    ) -> Result<Self, MappingError> {
        let metadata = Arc::clone(registry.get(type_name)?);
        let root = metadata
            .object_classes()
            .iter()
            .map(|class| Filter::equals(OBJECT_CLASS, class.as_str()))
            .collect();
        Ok(Self {
            registry,
            converters,
            metadata,
            root,
        })
    }

    /// Metadata of the type being filtered.
    pub fn metadata(&self) -> &Arc<ClassMetadata> {
        &self.metadata
    }

    /// A builder for comparisons on one property.
    pub fn property(&self, property: &str) -> Result<PropertyFilterBuilder, Error> {
        let attribute = self.metadata.require(property)?.clone();
        let encoder = match attribute.reference_target() {
            Some(target) => Encoder::Reference {
                registry: Arc::clone(&self.registry),
                target: target.to_string(),
            },
            None => Encoder::Typed(Arc::clone(self.converters.get(attribute.syntax)?)),
        };
        Ok(PropertyFilterBuilder { attribute, encoder })
    }

    /// Add filters directly to the root conjunction.
    pub fn and(&mut self, filters: impl IntoIterator<Item = Filter>) -> &mut Self {
        for filter in filters {
            absorb(&mut self.root, filter, true);
        }
        self
    }

    /// Add a disjunction of `filters` to the root.
    pub fn or(&mut self, filters: impl IntoIterator<Item = Filter>) -> &mut Self {
        self.add(Filter::or(filters))
    }

    /// Add a negation of `filter` to the root.
    pub fn not(&mut self, filter: Filter) -> &mut Self {
        self.add(Filter::not(filter))
    }

    /// Add one filter to the root.
    pub fn add(&mut self, filter: Filter) -> &mut Self {
        absorb(&mut self.root, filter, true);
        self
    }

    /// The filter built so far.
    pub fn build(&self) -> Filter {
        Filter::And(self.root.clone())
    }
}

impl fmt::Display for FilterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build())
    }
}

#[derive(Clone)]
enum Encoder {
    /// Values must be references to the target type or a subtype.
    Reference {
        registry: Arc<Registry>,
        target: String,
    },
    Typed(Arc<dyn Converter>),
}

impl fmt::Debug for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoder::Reference { target, .. } => write!(f, "Reference({})", target),
            Encoder::Typed(converter) => write!(f, "Typed({})", converter.syntax()),
        }
    }
}

/// Builds comparisons on one property, encoding values with its converter.
#[derive(Debug, Clone)]
pub struct PropertyFilterBuilder {
    attribute: AttributeMetadata,
    encoder: Encoder,
}

impl PropertyFilterBuilder {
    pub fn attribute(&self) -> &AttributeMetadata {
        &self.attribute
    }

    /// Encode a value for this property; null encodes to nothing.
    pub fn encode(&self, value: &Value) -> Result<Option<RawValue>, Error> {
        if value.is_null() {
            return Ok(None);
        }
        match &self.encoder {
            Encoder::Reference { registry, target } => match value {
                Value::Reference(r) if registry.is_subtype(&r.type_name, target) => {
                    Ok(Some(RawValue::Text(r.dn.to_string())))
                }
                other => Err(self.wrong_type(other).into()),
            },
            Encoder::Typed(converter) => {
                if value.value_type().as_ref() != Some(&self.attribute.value_type) {
                    return Err(self.wrong_type(value).into());
                }
                Ok(converter.to_directory(value)?)
            }
        }
    }

    /// Equality. Null yields a test for the attribute's absence.
    pub fn equals_to(&self, value: impl Into<Value>) -> Result<Filter, Error> {
        match self.encode(&value.into())? {
            Some(raw) => Ok(Filter::equals(self.name(), raw)),
            None => Ok(Filter::not(Filter::present(self.name()))),
        }
    }

    pub fn greater_or_equals(&self, value: impl Into<Value>) -> Result<Filter, Error> {
        self.ordered(Comparison::GreaterOrEqual, value.into())
    }

    pub fn less_or_equals(&self, value: impl Into<Value>) -> Result<Filter, Error> {
        self.ordered(Comparison::LessOrEqual, value.into())
    }

    pub fn approx(&self, value: impl Into<Value>) -> Result<Filter, Error> {
        self.ordered(Comparison::Approx, value.into())
    }

    /// The attribute has a value.
    pub fn present(&self) -> Filter {
        Filter::present(self.name())
    }

    /// Comparison with caller-encoded text, inserted verbatim.
    pub fn raw(&self, op: Comparison, raw: impl Into<String>) -> Filter {
        Filter::raw(self.name(), op, raw)
    }

    pub fn starts_with(&self, prefix: &str) -> Result<Filter, Error> {
        self.substring(format!("{}*", escape_assertion_value(prefix)))
    }

    pub fn ends_with(&self, suffix: &str) -> Result<Filter, Error> {
        self.substring(format!("*{}", escape_assertion_value(suffix)))
    }

    pub fn contains(&self, part: &str) -> Result<Filter, Error> {
        self.substring(format!("*{}*", escape_assertion_value(part)))
    }

    /// Parse text into a value of this property's type.
    ///
    /// References take the target's name; binary values are hex.
    pub fn parse_value(&self, text: &str) -> Result<Value, Error> {
        match (&self.encoder, &self.attribute.value_type) {
            (Encoder::Reference { target, .. }, _) => {
                Ok(Value::Reference(Reference::new(target.clone(), Dn::parse(text)?)))
            }
            (Encoder::Typed(converter), ValueType::Binary) => hex::decode(text)
                .map(Value::Binary)
                .map_err(|e| {
                    Error::from(ConversionError::Malformed {
                        syntax: converter.syntax(),
                        value: text.to_string(),
                        reason: e.to_string(),
                    })
                }),
            (Encoder::Typed(converter), _) => {
                Ok(converter.from_directory(&RawValue::Text(text.to_string()))?)
            }
        }
    }

    fn name(&self) -> &str {
        &self.attribute.attribute_name
    }

    fn ordered(&self, op: Comparison, value: Value) -> Result<Filter, Error> {
        match self.encode(&value)? {
            Some(raw) => Ok(Filter::compare(self.name(), op, raw)),
            None => Err(ConversionError::NullComparison {
                attribute: self.name().to_string(),
                operator: op,
            }
            .into()),
        }
    }

    fn substring(&self, raw: String) -> Result<Filter, Error> {
        if self.attribute.value_type != ValueType::String {
            return Err(ConversionError::WrongType {
                property: self.attribute.property_name.clone(),
                expected: self.attribute.value_type.clone(),
                actual: ValueType::String,
            }
            .into());
        }
        Ok(Filter::raw(self.name(), Comparison::Equals, raw))
    }

    fn wrong_type(&self, value: &Value) -> ConversionError {
        ConversionError::WrongType {
            property: self.attribute.property_name.clone(),
            expected: self.attribute.value_type.clone(),
            actual: value.value_type().unwrap_or(ValueType::List),
        }
    }
}
