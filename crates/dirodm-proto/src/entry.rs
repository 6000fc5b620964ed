//! Directory entries, raw attribute values and modifications.

use crate::dn::Dn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the attribute holding an entry's object classes.
pub const OBJECT_CLASS: &str = "objectClass";

/// A raw attribute value as carried by the directory protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Textual value (UTF-8).
    Text(String),
    /// Binary value.
    Binary(Vec<u8>),
}

impl RawValue {
    /// Try to get the value as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            RawValue::Binary(b) => std::str::from_utf8(b).ok(),
        }
    }

    /// Get the value's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RawValue::Text(s) => s.as_bytes(),
            RawValue::Binary(b) => b,
        }
    }

    /// Check if this value is binary.
    pub fn is_binary(&self) -> bool {
        matches!(self, RawValue::Binary(_))
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => f.write_str(s),
            RawValue::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::Text(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        RawValue::Binary(v)
    }
}

/// A named attribute with an ordered set of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// Attribute name as first spelled.
    pub name: String,
    /// Values in insertion order, without duplicates.
    pub values: Vec<RawValue>,
}

impl Attribute {
    /// Create an empty attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }

    /// Check if the attribute holds `value`.
    pub fn contains(&self, value: &RawValue) -> bool {
        self.values.contains(value)
    }
}

/// A change to one attribute of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Modification {
    /// Add values to the attribute.
    Add {
        attribute: String,
        values: Vec<RawValue>,
    },
    /// Remove specific values from the attribute.
    Remove {
        attribute: String,
        values: Vec<RawValue>,
    },
    /// Remove the attribute with all of its values.
    Clear { attribute: String },
}

impl Modification {
    /// Name of the attribute this modification touches.
    pub fn attribute(&self) -> &str {
        match self {
            Modification::Add { attribute, .. }
            | Modification::Remove { attribute, .. }
            | Modification::Clear { attribute } => attribute,
        }
    }
}

/// A directory entry: a name plus its attributes.
///
/// Attribute names are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryRepr", into = "EntryRepr")]
pub struct DirectoryEntry {
    dn: Dn,
    attributes: BTreeMap<String, Attribute>,
}

#[derive(Serialize, Deserialize)]
struct EntryRepr {
    dn: Dn,
    #[serde(default)]
    attributes: BTreeMap<String, Vec<RawValue>>,
}

impl From<EntryRepr> for DirectoryEntry {
    fn from(repr: EntryRepr) -> Self {
        let mut entry = DirectoryEntry::new(repr.dn);
        for (name, values) in repr.attributes {
            entry.set_values(&name, values);
        }
        entry
    }
}

impl From<DirectoryEntry> for EntryRepr {
    fn from(entry: DirectoryEntry) -> Self {
        EntryRepr {
            dn: entry.dn,
            attributes: entry
                .attributes
                .into_values()
                .map(|a| (a.name, a.values))
                .collect(),
        }
    }
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl DirectoryEntry {
    /// Create an entry with no attributes.
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: BTreeMap::new(),
        }
    }

    /// Add text values (builder form).
    pub fn with_values<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RawValue>,
    {
        for value in values {
            self.add_value(name, value.into());
        }
        self
    }

    /// The entry's name.
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Get an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(&key(name))
    }

    /// Get the values of an attribute (empty if absent).
    pub fn values(&self, name: &str) -> &[RawValue] {
        self.attribute(name)
            .map(|a| a.values.as_slice())
            .unwrap_or_default()
    }

    /// Get the first value of an attribute.
    pub fn first_value(&self, name: &str) -> Option<&RawValue> {
        self.values(name).first()
    }

    /// Get the textual values of an attribute.
    pub fn text_values(&self, name: &str) -> Vec<&str> {
        self.values(name).iter().filter_map(RawValue::as_text).collect()
    }

    /// The entry's object classes.
    pub fn object_classes(&self) -> Vec<&str> {
        self.text_values(OBJECT_CLASS)
    }

    /// Check for an object class (case-insensitive).
    pub fn has_object_class(&self, class: &str) -> bool {
        self.object_classes()
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class))
    }

    /// Check if the attribute is present with at least one value.
    pub fn has_attribute(&self, name: &str) -> bool {
        !self.values(name).is_empty()
    }

    /// Add a value. Returns `false` if it was already present.
    pub fn add_value(&mut self, name: &str, value: RawValue) -> bool {
        let attribute = self
            .attributes
            .entry(key(name))
            .or_insert_with(|| Attribute::new(name));
        if attribute.contains(&value) {
            return false;
        }
        attribute.values.push(value);
        true
    }

    /// Remove a value. Returns `false` if it was not present.
    ///
    /// The attribute disappears with its last value.
    pub fn remove_value(&mut self, name: &str, value: &RawValue) -> bool {
        let k = key(name);
        let Some(attribute) = self.attributes.get_mut(&k) else {
            return false;
        };
        let before = attribute.values.len();
        attribute.values.retain(|v| v != value);
        let removed = attribute.values.len() != before;
        if attribute.values.is_empty() {
            self.attributes.remove(&k);
        }
        removed
    }

    /// Replace all values of an attribute.
    pub fn set_values(&mut self, name: &str, values: Vec<RawValue>) {
        self.attributes.remove(&key(name));
        for value in values {
            self.add_value(name, value);
        }
    }

    /// Remove an attribute entirely.
    pub fn clear(&mut self, name: &str) -> Option<Attribute> {
        self.attributes.remove(&key(name))
    }

    /// Iterate over attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the entry has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Keep only the named attributes.
    pub fn retain_attributes(&mut self, names: &[String]) {
        self.attributes
            .retain(|k, _| names.iter().any(|n| n.eq_ignore_ascii_case(k)));
    }

    /// Apply a list of modifications in order.
    pub fn apply(&mut self, modifications: &[Modification]) {
        for modification in modifications {
            match modification {
                Modification::Add { attribute, values } => {
                    for value in values {
                        self.add_value(attribute, value.clone());
                    }
                }
                Modification::Remove { attribute, values } => {
                    for value in values {
                        self.remove_value(attribute, value);
                    }
                }
                Modification::Clear { attribute } => {
                    self.clear(attribute);
                }
            }
        }
    }
}
