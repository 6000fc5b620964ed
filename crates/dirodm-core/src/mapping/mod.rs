//! Mapping between records and directory entries.

mod merge;

pub use merge::EntryMerger;

use crate::catalog::{AttributeMetadata, Cardinality, ClassMetadata, Record, Registry};
use crate::convert::{Converter, ConverterSet};
use crate::error::{ConversionError, Error};
use crate::value::{Properties, Reference, Value, ValueType};
use dirodm_proto::{DirectoryEntry, Modification, RawValue};
use std::sync::Arc;

/// Converts records to entries and back using registered metadata.
pub struct Mapper<'a> {
    registry: &'a Registry,
    converters: &'a ConverterSet,
}

impl<'a> Mapper<'a> {
    pub fn new(registry: &'a Registry, converters: &'a ConverterSet) -> Self {
        Self {
            registry,
            converters,
        }
    }

    /// Write a record's state into `entry` and return the modifications made.
    ///
    /// Object classes are only ever added. Null properties and empty
    /// collections remove their attribute.
    pub fn to_entry(
        &self,
        record: &Record,
        entry: &mut DirectoryEntry,
    ) -> Result<Vec<Modification>, Error> {
        let metadata = self.registry.get(&record.type_name)?;
        for (property, _) in record.properties.iter() {
            metadata.require(property)?;
        }

        let mut encoded = Vec::with_capacity(metadata.attributes().len());
        for attr in metadata.attributes() {
            let values = self.encode_property(attr, record.properties.value(&attr.property_name))?;
            encoded.push((attr, self.converters.get(attr.syntax)?, values));
        }

        let mut merger = EntryMerger::new(entry);
        merger.merge_object_classes(metadata.object_classes());
        for (attr, converter, values) in encoded {
            // Compare decoded values; undecodable stored values only match themselves.
            merger.merge(&attr.attribute_name, values, |raw| {
                decode_one(attr, converter.as_ref(), raw).map_err(|_| raw.clone())
            });
        }
        Ok(merger.finish())
    }

    /// Decode an entry into a record.
    ///
    /// The entry's most specific registered type is used when it is a subtype
    /// of `expected`; otherwise `expected` itself.
    pub fn from_entry(
        &self,
        entry: &DirectoryEntry,
        expected: Option<&Arc<ClassMetadata>>,
    ) -> Result<Record, Error> {
        let metadata = self.resolve(entry, expected)?;
        let mut properties = Properties::new();

        for attr in metadata.attributes() {
            let converter = self.converters.get(attr.syntax)?;
            let mut decoded = entry
                .values(&attr.attribute_name)
                .iter()
                .map(|raw| decode_one(attr, converter.as_ref(), raw))
                .collect::<Result<Vec<_>, _>>()?;
            if decoded.is_empty() {
                continue;
            }
            let value = match attr.cardinality {
                Cardinality::Multivalued => Value::List(decoded),
                Cardinality::Single => {
                    if decoded.len() > 1 {
                        tracing::warn!(
                            dn = %entry.dn(),
                            attribute = %attr.attribute_name,
                            count = decoded.len(),
                            "single-valued property has several values, keeping the first"
                        );
                    }
                    decoded.swap_remove(0)
                }
            };
            properties.set(attr.property_name.clone(), value);
        }

        Ok(Record {
            type_name: metadata.type_name().to_string(),
            dn: entry.dn().clone(),
            properties,
        })
    }

    /// Pick the metadata to decode an entry with.
    pub fn resolve(
        &self,
        entry: &DirectoryEntry,
        expected: Option<&Arc<ClassMetadata>>,
    ) -> Result<Arc<ClassMetadata>, Error> {
        let classes = entry.object_classes();
        match (self.registry.resolve(classes.as_slice()), expected) {
            (Ok(found), Some(expected))
                if self
                    .registry
                    .is_subtype(found.type_name(), expected.type_name()) =>
            {
                Ok(Arc::clone(found))
            }
            (Ok(found), Some(expected)) => {
                tracing::debug!(
                    dn = %entry.dn(),
                    found = found.type_name(),
                    expected = expected.type_name(),
                    "entry resolves to an unrelated type, decoding as requested"
                );
                Ok(Arc::clone(expected))
            }
            (Ok(found), None) => Ok(Arc::clone(found)),
            (Err(e), Some(expected)) => {
                tracing::debug!(
                    dn = %entry.dn(),
                    expected = expected.type_name(),
                    error = %e,
                    "cannot resolve entry type, decoding as requested"
                );
                Ok(Arc::clone(expected))
            }
            (Err(e), None) => Err(e.into()),
        }
    }

    fn encode_property(&self, attr: &AttributeMetadata, value: &Value) -> Result<Vec<RawValue>, Error> {
        let converter = self.converters.get(attr.syntax)?;
        match (attr.cardinality, value) {
            (_, Value::Null) => Ok(Vec::new()),
            (Cardinality::Multivalued, Value::List(items)) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    if let Some(raw) = self.encode_one(attr, converter.as_ref(), item)? {
                        values.push(raw);
                    }
                }
                Ok(values)
            }
            (Cardinality::Multivalued, other) => Err(wrong_type(attr, ValueType::List, other).into()),
            (Cardinality::Single, Value::List(_)) => {
                Err(wrong_type(attr, attr.value_type.clone(), value).into())
            }
            (Cardinality::Single, other) => Ok(self
                .encode_one(attr, converter.as_ref(), other)?
                .into_iter()
                .collect()),
        }
    }

    fn encode_one(
        &self,
        attr: &AttributeMetadata,
        converter: &dyn Converter,
        value: &Value,
    ) -> Result<Option<RawValue>, Error> {
        let matches = match (value, attr.reference_target()) {
            (Value::Null, _) => true,
            (Value::Reference(r), Some(target)) => self.registry.is_subtype(&r.type_name, target),
            (_, Some(_)) => false,
            (other, None) => other.value_type().as_ref() == Some(&attr.value_type),
        };
        if !matches {
            return Err(wrong_type(attr, attr.value_type.clone(), value).into());
        }
        Ok(converter.to_directory(value)?)
    }
}

fn decode_one(attr: &AttributeMetadata, converter: &dyn Converter, raw: &RawValue) -> Result<Value, Error> {
    let value = converter.from_directory(raw)?;
    Ok(match (value, attr.reference_target()) {
        (Value::Dn(dn), Some(target)) => Value::Reference(Reference::new(target, dn)),
        (value, _) => value,
    })
}

fn wrong_type(attr: &AttributeMetadata, expected: ValueType, actual: &Value) -> ConversionError {
    ConversionError::WrongType {
        property: attr.property_name.clone(),
        expected,
        actual: actual.value_type().unwrap_or(ValueType::List),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::Syntax;
    use crate::error::MappingError;
    use chrono::{TimeZone, Utc};
    use dirodm_proto::{Dn, OBJECT_CLASS};

    fn registry() -> Registry {
        let person = ClassMetadata::builder("Person")
            .object_class("person")
            .attribute(AttributeMetadata::string("commonName", "cn"))
            .attribute(AttributeMetadata::string("surname", "sn"))
            .attribute(AttributeMetadata::string("mail", "mail").multivalued())
            .attribute(AttributeMetadata::integer("uid", "uidNumber"))
            .attribute(AttributeMetadata::boolean("active", "active"))
            .attribute(AttributeMetadata::timestamp("created", "createTimestamp"))
            .attribute(
                AttributeMetadata::string("password", "userPassword")
                    .with_syntax(Syntax::BinaryString),
            )
            .attribute(AttributeMetadata::binary("photo", "jpegPhoto"))
            .attribute(AttributeMetadata::reference("manager", "manager", "Person"))
            .build()
            .unwrap();
        let employee = ClassMetadata::builder("Employee")
            .object_classes(["person", "organizationalPerson"])
            .attribute(AttributeMetadata::string("commonName", "cn"))
            .attribute(AttributeMetadata::string("title", "title"))
            .build()
            .unwrap();
        let group = ClassMetadata::builder("Group")
            .object_class("groupOfNames")
            .attribute(AttributeMetadata::string("name", "cn"))
            .attribute(AttributeMetadata::reference("members", "member", "Person").multivalued())
            .build()
            .unwrap();
        Registry::builder()
            .with_metadata(person)
            .with_metadata(employee)
            .with_metadata(group)
            .build()
            .unwrap()
    }

    fn dn(text: &str) -> Dn {
        Dn::parse(text).unwrap()
    }

    #[test]
    fn test_record_to_new_entry() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);

        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let record = Record::new("Person", dn("cn=alex,dc=example"))
            .with("commonName", "alex")
            .with("mail", vec!["a@example.com".to_string(), "b@example.com".to_string()])
            .with("uid", 1000i64)
            .with("active", true)
            .with("created", created)
            .with("password", "secret");

        let mut entry = DirectoryEntry::new(record.dn.clone());
        let mods = mapper.to_entry(&record, &mut entry).unwrap();

        assert_eq!(entry.object_classes(), vec!["top", "person"]);
        assert_eq!(entry.text_values("cn"), vec!["alex"]);
        assert_eq!(entry.text_values("mail").len(), 2);
        assert_eq!(entry.text_values("uidNumber"), vec!["1000"]);
        assert_eq!(entry.text_values("active"), vec!["TRUE"]);
        assert_eq!(entry.text_values("createTimestamp"), vec!["20240102030405Z"]);
        assert_eq!(
            entry.first_value("userPassword"),
            Some(&RawValue::Binary(b"secret".to_vec()))
        );
        assert!(!entry.has_attribute("sn"));
        assert_eq!(mods.len(), 7);
    }

    #[test]
    fn test_entry_to_record() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);

        let entry = DirectoryEntry::new(dn("cn=alex,dc=example"))
            .with_values(OBJECT_CLASS, ["top", "person"])
            .with_values("cn", ["alex"])
            .with_values("mail", ["a@example.com"])
            .with_values("uidNumber", ["1000"])
            .with_values("active", ["false"]);

        let record = mapper.from_entry(&entry, None).unwrap();
        assert_eq!(record.type_name, "Person");
        assert_eq!(record.get("commonName"), &Value::from("alex"));
        assert_eq!(
            record.get("mail"),
            &Value::List(vec![Value::from("a@example.com")])
        );
        assert_eq!(record.get("uid"), &Value::Integer(1000));
        assert_eq!(record.get("active"), &Value::Boolean(false));
        assert!(record.get("surname").is_null());
    }

    #[test]
    fn test_roundtrip_through_entry() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);

        let record = Record::new("Person", dn("cn=alex,dc=example"))
            .with("commonName", "alex")
            .with("surname", "mathieu")
            .with("mail", vec!["a@example.com".to_string()])
            .with("password", "secret");
        let mut entry = DirectoryEntry::new(record.dn.clone());
        mapper.to_entry(&record, &mut entry).unwrap();

        assert_eq!(mapper.from_entry(&entry, None).unwrap(), record);
    }

    #[test]
    fn test_update_diffs_against_stored_state() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);

        let mut entry = DirectoryEntry::new(dn("cn=alex,dc=example"))
            .with_values(OBJECT_CLASS, ["top", "person", "inetOrgPerson"])
            .with_values("cn", ["alex"])
            .with_values("sn", ["mathieu"])
            .with_values("mail", ["a@example.com", "b@example.com"]);

        let record = Record::new("Person", entry.dn().clone())
            .with("commonName", "alex")
            .with("mail", vec!["b@example.com".to_string(), "c@example.com".to_string()]);
        let mods = mapper.to_entry(&record, &mut entry).unwrap();

        assert_eq!(
            mods,
            vec![
                Modification::Clear {
                    attribute: "sn".into()
                },
                Modification::Remove {
                    attribute: "mail".into(),
                    values: vec!["a@example.com".into()],
                },
                Modification::Add {
                    attribute: "mail".into(),
                    values: vec!["c@example.com".into()],
                },
            ]
        );
        assert!(entry.has_object_class("inetOrgPerson"));
    }

    #[test]
    fn test_decoded_record_merges_to_nothing() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);

        // Every syntax, stored in a form the encoder would not produce.
        let entry = DirectoryEntry::new(dn("cn=alex,dc=example"))
            .with_values(OBJECT_CLASS, ["top", "person"])
            .with_values("cn", ["alex"])
            .with_values("mail", ["b@example.com", "a@example.com"])
            .with_values("uidNumber", ["042"])
            .with_values("active", ["true"])
            .with_values("createTimestamp", ["20240309160500+0200"])
            .with_values("manager", ["CN=Boss, DC=Example"])
            .with_values("jpegPhoto", [RawValue::Binary(vec![0xff, 0xd8, 0x00])])
            .with_values("userPassword", [RawValue::Binary(b"secret".to_vec())]);

        let record = mapper.from_entry(&entry, None).unwrap();
        let mut stored = entry.clone();
        let mods = mapper.to_entry(&record, &mut stored).unwrap();
        assert!(mods.is_empty(), "unexpected modifications: {:?}", mods);
        assert_eq!(stored, entry);

        let mods = mapper
            .to_entry(&record.with("uid", 43i64), &mut stored)
            .unwrap();
        assert_eq!(
            mods,
            vec![
                Modification::Remove {
                    attribute: "uidNumber".into(),
                    values: vec!["042".into()],
                },
                Modification::Add {
                    attribute: "uidNumber".into(),
                    values: vec!["43".into()],
                },
            ]
        );
        assert_eq!(stored.text_values("uidNumber"), vec!["43"]);
        assert_eq!(stored.text_values("active"), vec!["true"]);
    }

    #[test]
    fn test_undecodable_stored_value_is_replaced() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);

        let mut entry = DirectoryEntry::new(dn("cn=alex,dc=example"))
            .with_values(OBJECT_CLASS, ["top", "person"])
            .with_values("uidNumber", ["lots"]);
        let record = Record::new("Person", entry.dn().clone()).with("uid", 7i64);
        let mods = mapper.to_entry(&record, &mut entry).unwrap();
        assert_eq!(
            mods,
            vec![
                Modification::Remove {
                    attribute: "uidNumber".into(),
                    values: vec!["lots".into()],
                },
                Modification::Add {
                    attribute: "uidNumber".into(),
                    values: vec!["7".into()],
                },
            ]
        );
    }

    #[test]
    fn test_subtype_resolution() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);
        let person = registry.get("Person").unwrap();

        let entry = DirectoryEntry::new(dn("cn=boss,dc=example"))
            .with_values(OBJECT_CLASS, ["top", "person", "organizationalPerson"])
            .with_values("cn", ["boss"])
            .with_values("title", ["chief"]);
        let record = mapper.from_entry(&entry, Some(person)).unwrap();
        assert_eq!(record.type_name, "Employee");
        assert_eq!(record.get("title"), &Value::from("chief"));

        let unknown = DirectoryEntry::new(dn("cn=odd,dc=example"))
            .with_values(OBJECT_CLASS, ["top", "device"])
            .with_values("cn", ["odd"]);
        let record = mapper.from_entry(&unknown, Some(person)).unwrap();
        assert_eq!(record.type_name, "Person");
        assert!(matches!(
            mapper.from_entry(&unknown, None),
            Err(Error::Mapping(MappingError::UnknownObjectClasses(_)))
        ));
    }

    #[test]
    fn test_references() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);

        let alex = dn("cn=alex,dc=example");
        let boss = dn("cn=boss,dc=example");
        let record = Record::new("Group", dn("cn=admins,dc=example"))
            .with("name", "admins")
            .with(
                "members",
                vec![
                    Reference::new("Person", alex.clone()),
                    Reference::new("Employee", boss.clone()),
                ],
            );
        let mut entry = DirectoryEntry::new(record.dn.clone());
        mapper.to_entry(&record, &mut entry).unwrap();
        assert_eq!(
            entry.text_values("member"),
            vec!["cn=alex,dc=example", "cn=boss,dc=example"]
        );

        let decoded = mapper.from_entry(&entry, None).unwrap();
        assert_eq!(
            decoded.get("members"),
            &Value::List(vec![
                Value::Reference(Reference::new("Person", alex)),
                Value::Reference(Reference::new("Person", boss)),
            ])
        );
    }

    #[test]
    fn test_type_errors() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);
        let target = dn("cn=alex,dc=example");

        let cases = [
            Record::new("Person", target.clone()).with("uid", "many"),
            Record::new("Person", target.clone()).with("mail", "a@example.com"),
            Record::new("Person", target.clone())
                .with("commonName", vec!["a".to_string(), "b".to_string()]),
            Record::new("Group", target.clone())
                .with("members", vec![Reference::new("Group", target.clone())]),
        ];
        for record in cases {
            let mut entry = DirectoryEntry::new(target.clone());
            assert!(
                matches!(
                    mapper.to_entry(&record, &mut entry),
                    Err(Error::Conversion(ConversionError::WrongType { .. }))
                ),
                "{:?} should be rejected",
                record
            );
        }

        let record = Record::new("Person", target.clone()).with("age", 3i64);
        let mut entry = DirectoryEntry::new(target);
        assert!(matches!(
            mapper.to_entry(&record, &mut entry),
            Err(Error::Mapping(MappingError::UnknownProperty { .. }))
        ));
    }

    #[test]
    fn test_malformed_stored_value() {
        let registry = registry();
        let converters = ConverterSet::standard();
        let mapper = Mapper::new(&registry, &converters);
        let entry = DirectoryEntry::new(dn("cn=alex,dc=example"))
            .with_values(OBJECT_CLASS, ["top", "person"])
            .with_values("uidNumber", ["lots"]);
        assert!(matches!(
            mapper.from_entry(&entry, None),
            Err(Error::Conversion(ConversionError::Malformed { .. }))
        ));
    }
}
