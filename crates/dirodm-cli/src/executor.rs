//! Command execution against a schema and a directory fixture.

use crate::formatter::Formatter;
use dirodm_core::catalog::{Record, SchemaDeclaration};
use dirodm_core::config::EngineConfig;
use dirodm_core::directory::MemoryDirectory;
use dirodm_core::filter::{Comparison, Filter, FilterBuilder, PropertyFilterBuilder};
use dirodm_core::session::SessionFactory;
use dirodm_proto::{Dn, SearchScope};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by the command line tool.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] dirodm_core::Error),

    /// A `--where` condition could not be read.
    #[error("invalid condition '{condition}': {reason}")]
    Condition { condition: String, reason: String },
}

/// One `--where` condition: property, operator and value text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition<'a> {
    pub property: &'a str,
    pub op: Comparison,
    pub value: &'a str,
}

impl<'a> Condition<'a> {
    /// Split `prop=value`, `prop>=value`, `prop<=value` or `prop~=value`.
    pub fn parse(text: &'a str) -> Result<Self, CliError> {
        let invalid = |reason: &str| CliError::Condition {
            condition: text.to_string(),
            reason: reason.to_string(),
        };

        let eq = text.find('=').ok_or_else(|| invalid("expected an operator"))?;
        let (end, op) = match text[..eq].chars().last() {
            Some('>') => (eq - 1, Comparison::GreaterOrEqual),
            Some('<') => (eq - 1, Comparison::LessOrEqual),
            Some('~') => (eq - 1, Comparison::Approx),
            _ => (eq, Comparison::Equals),
        };
        let property = text[..end].trim();
        if property.is_empty() {
            return Err(invalid("missing property name"));
        }
        Ok(Self {
            property,
            op,
            value: &text[eq + 1..],
        })
    }

    /// Turn the condition into a filter on `property`.
    ///
    /// For equality, `*` alone tests presence and a leading or trailing `*`
    /// makes a substring match.
    pub fn to_filter(&self, property: &PropertyFilterBuilder) -> Result<Filter, CliError> {
        let value = self.value;
        let filter = match self.op {
            Comparison::Equals if value == "*" => property.present(),
            Comparison::Equals if value.len() > 1 && value.starts_with('*') && value.ends_with('*') => {
                property.contains(&value[1..value.len() - 1])?
            }
            Comparison::Equals if value.ends_with('*') => {
                property.starts_with(&value[..value.len() - 1])?
            }
            Comparison::Equals if value.starts_with('*') => property.ends_with(&value[1..])?,
            Comparison::Equals => property.equals_to(property.parse_value(value)?)?,
            Comparison::GreaterOrEqual => {
                property.greater_or_equals(property.parse_value(value)?)?
            }
            Comparison::LessOrEqual => property.less_or_equals(property.parse_value(value)?)?,
            Comparison::Approx => property.approx(property.parse_value(value)?)?,
        };
        Ok(filter)
    }
}

/// Build the filter for `type_name` with every condition ANDed in.
pub fn build_filter(builder: &mut FilterBuilder, conditions: &[String]) -> Result<Filter, CliError> {
    let mut filters = Vec::with_capacity(conditions.len());
    for text in conditions {
        let condition = Condition::parse(text)?;
        let property = builder.property(condition.property)?;
        filters.push(condition.to_filter(&property)?);
    }
    builder.and(filters);
    Ok(builder.build())
}

/// Open a factory over a declared schema and an optional fixture file.
pub fn open_factory(
    schema: &Path,
    data: Option<&Path>,
    config: EngineConfig,
) -> Result<SessionFactory, CliError> {
    let registry = SchemaDeclaration::load(schema)?.into_registry()?;
    tracing::info!(types = registry.len(), schema = %schema.display(), "loaded schema");
    let directory = match data {
        Some(path) => MemoryDirectory::load(path)?,
        None => MemoryDirectory::new(),
    };
    Ok(SessionFactory::new(registry, Arc::new(directory)).with_config(config))
}

/// Print the encoded filter.
pub fn encode(
    factory: &SessionFactory,
    type_name: &str,
    conditions: &[String],
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let mut builder = factory.filter_builder_for(type_name)?;
    let filter = build_filter(&mut builder, conditions)?;
    Ok(formatter.format_filter(&filter))
}

/// Where and how to search.
#[derive(Debug, Clone)]
pub struct SearchTarget<'a> {
    pub type_name: &'a str,
    pub conditions: &'a [String],
    pub base: Dn,
    pub scope: SearchScope,
}

pub fn search(
    factory: &SessionFactory,
    target: &SearchTarget<'_>,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let mut session = factory.open_session();
    let filter = target_filter(factory, target)?;
    let records = session.search_records(target.type_name, &target.base, &filter, target.scope)?;
    Ok(formatter.format_records(&records))
}

pub fn count(
    factory: &SessionFactory,
    target: &SearchTarget<'_>,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let session = factory.open_session();
    let filter = target_filter(factory, target)?;
    let count = session.count(&target.base, &filter, target.scope)?;
    Ok(formatter.format_count(count))
}

/// Run a paged search to completion. A page size of 0 uses the configured one.
pub fn pages(
    factory: &SessionFactory,
    target: &SearchTarget<'_>,
    page_size: u32,
    formatter: &dyn Formatter,
) -> Result<String, CliError> {
    let mut session = factory.open_session();
    let filter = target_filter(factory, target)?;
    let pages = session
        .record_pages(target.type_name, page_size, &filter, &target.base)?
        .collect::<Result<Vec<Vec<Record>>, _>>()?;
    tracing::debug!(pages = pages.len(), "paged search finished");
    Ok(formatter.format_pages(&pages))
}

fn target_filter(factory: &SessionFactory, target: &SearchTarget<'_>) -> Result<Filter, CliError> {
    let mut builder = factory.filter_builder_for(target.type_name)?;
    build_filter(&mut builder, target.conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::{JsonFormatter, TableFormatter};

    const SCHEMA: &str = r#"{
        "types": [
            {
                "name": "Person",
                "object_classes": ["person"],
                "attributes": [
                    { "property": "name", "attribute": "cn", "type": "string" },
                    { "property": "surname", "attribute": "sn", "type": "string" },
                    { "property": "age", "type": "integer" }
                ]
            }
        ]
    }"#;

    const DATA: &str = r#"[
        { "dn": "ou=people,dc=example", "attributes": { "objectClass": ["top", "organizationalUnit"] } },
        { "dn": "cn=alex,ou=people,dc=example",
          "attributes": { "objectClass": ["top", "person"], "cn": ["alex"], "sn": ["Mathieu"], "age": ["34"] } },
        { "dn": "cn=jeff,ou=people,dc=example",
          "attributes": { "objectClass": ["top", "person"], "cn": ["jeff"], "sn": ["Mathieu"], "age": ["28"] } },
        { "dn": "cn=sam,ou=people,dc=example",
          "attributes": { "objectClass": ["top", "person"], "cn": ["sam"], "sn": ["Other"], "age": ["51"] } }
    ]"#;

    struct Fixture {
        factory: SessionFactory,
        _dir: tempfile::TempDir,
    }

    fn fixture(config: EngineConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.json");
        let data = dir.path().join("data.json");
        std::fs::write(&schema, SCHEMA).unwrap();
        std::fs::write(&data, DATA).unwrap();
        let factory = open_factory(&schema, Some(&data), config).unwrap();
        Fixture { factory, _dir: dir }
    }

    fn target<'a>(conditions: &'a [String]) -> SearchTarget<'a> {
        SearchTarget {
            type_name: "Person",
            conditions,
            base: Dn::parse("ou=people,dc=example").unwrap(),
            scope: SearchScope::Subtree,
        }
    }

    #[test]
    fn test_parse_condition() {
        let c = Condition::parse("age>=30").unwrap();
        assert_eq!((c.property, c.op, c.value), ("age", Comparison::GreaterOrEqual, "30"));

        let c = Condition::parse("name = a=b").unwrap();
        assert_eq!((c.property, c.op, c.value), ("name", Comparison::Equals, " a=b"));

        let c = Condition::parse("name~=alx").unwrap();
        assert_eq!(c.op, Comparison::Approx);

        assert!(Condition::parse("name").is_err());
        assert!(Condition::parse("=x").is_err());
    }

    #[test]
    fn test_encode() {
        let fx = fixture(EngineConfig::default());
        let conditions = vec!["surname=Mathieu".to_string(), "age<=30".to_string()];
        let output = encode(&fx.factory, "Person", &conditions, &TableFormatter).unwrap();
        assert_eq!(
            output,
            "(&(objectClass=top)(objectClass=person)(sn=Mathieu)(age<=30))"
        );

        let wildcard = vec!["name=al*".to_string(), "surname=*".to_string()];
        let output = encode(&fx.factory, "Person", &wildcard, &TableFormatter).unwrap();
        assert_eq!(
            output,
            "(&(objectClass=top)(objectClass=person)(cn=al*)(sn=*))"
        );
    }

    #[test]
    fn test_encode_errors() {
        let fx = fixture(EngineConfig::default());
        let unknown = vec!["nickname=al".to_string()];
        assert!(matches!(
            encode(&fx.factory, "Person", &unknown, &TableFormatter),
            Err(CliError::Engine(_))
        ));
        let not_a_number = vec!["age>=old".to_string()];
        assert!(encode(&fx.factory, "Person", &not_a_number, &TableFormatter).is_err());
        assert!(encode(&fx.factory, "Robot", &[], &TableFormatter).is_err());
    }

    #[test]
    fn test_search_and_count() {
        let fx = fixture(EngineConfig::default());
        let conditions = vec!["surname=mathieu".to_string()];
        let output = search(&fx.factory, &target(&conditions), &JsonFormatter).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[0]["properties"]["age"], 34);

        let output = count(&fx.factory, &target(&conditions), &JsonFormatter).unwrap();
        assert_eq!(output, r#"{"count":2}"#);
    }

    #[test]
    fn test_pages() {
        let fx = fixture(EngineConfig::new().with_page_size(2));
        let output = pages(&fx.factory, &target(&[]), 0, &JsonFormatter).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let sizes: Vec<usize> = parsed
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_array().unwrap().len())
            .collect();
        assert_eq!(sizes, vec![2, 1]);
    }

    #[test]
    fn test_size_limit_error() {
        let fx = fixture(EngineConfig::new().with_size_limit(1));
        let err = search(&fx.factory, &target(&[]), &TableFormatter).unwrap_err();
        assert!(err.to_string().contains("size limit"));
    }
}
