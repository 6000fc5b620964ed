//! Distinguished names.
//!
//! A [`Dn`] is kept both as the text it was created from and as its parsed
//! components. Equality, ordering and hashing use a normalized form so that
//! `CN=Alex, DC=Example` and `cn=alex,dc=example` name the same entry.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// One `attribute=value` component of a distinguished name.
#[derive(Debug, Clone)]
pub struct Rdn {
    attribute: String,
    value: String,
}

impl Rdn {
    /// Create a component from an attribute type and an unescaped value.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// The attribute type (e.g. `cn`).
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The unescaped attribute value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn normalized(&self) -> String {
        format!(
            "{}={}",
            self.attribute.to_ascii_lowercase(),
            escape_value(&self.value.to_lowercase())
        )
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, escape_value(&self.value))
    }
}

/// A distinguished name, leaf component first.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Dn {
    text: String,
    rdns: Vec<Rdn>,
    normalized: String,
}

impl Dn {
    /// The empty name at the root of the tree.
    pub fn root() -> Self {
        Self {
            text: String::new(),
            rdns: Vec::new(),
            normalized: String::new(),
        }
    }

    /// Parse a textual distinguished name (RFC 4514 string form).
    pub fn parse(text: &str) -> Result<Self, Error> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let invalid = |reason: &str| Error::InvalidDn {
            dn: text.to_string(),
            reason: reason.to_string(),
        };

        let mut rdns = Vec::new();
        for component in split_unescaped(trimmed, ',') {
            let (attribute, value) = component
                .split_once('=')
                .ok_or_else(|| invalid("missing '=' in component"))?;
            let attribute = attribute.trim();
            if attribute.is_empty() {
                return Err(invalid("empty attribute type"));
            }
            let value = unescape_value(value.trim()).map_err(|reason| invalid(&reason))?;
            rdns.push(Rdn::new(attribute, value));
        }

        Ok(Self::from_parts(trimmed.to_string(), rdns))
    }

    fn from_parts(text: String, rdns: Vec<Rdn>) -> Self {
        let normalized = rdns
            .iter()
            .map(Rdn::normalized)
            .collect::<Vec<_>>()
            .join(",");
        Self {
            text,
            rdns,
            normalized,
        }
    }

    fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let text = rdns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self::from_parts(text, rdns)
    }

    /// Build the name of a child entry, escaping `value` as needed.
    pub fn child(&self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(Rdn::new(attribute, value));
        rdns.extend(self.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// The name of the parent entry, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self::from_rdns(self.rdns[1..].to_vec()))
    }

    /// The leaf component, `None` for the root.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// All components, leaf first.
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Number of components.
    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    /// Check if this is the root name.
    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Check if this name lies strictly below `base`.
    pub fn is_descendant_of(&self, base: &Dn) -> bool {
        if self.rdns.len() <= base.rdns.len() {
            return false;
        }
        if base.is_root() {
            return true;
        }
        self.normalized.ends_with(&base.normalized)
            && self.normalized[..self.normalized.len() - base.normalized.len()].ends_with(',')
    }

    /// Check if this name is `base` or lies below it.
    pub fn is_within(&self, base: &Dn) -> bool {
        self == base || self.is_descendant_of(base)
    }

    /// The text of the name.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dn({:?})", self.text)
    }
}

impl FromStr for Dn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Dn {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Dn> for String {
    fn from(dn: Dn) -> Self {
        dn.text
    }
}

/// Escape an attribute value for use inside a distinguished name (RFC 4514).
pub fn escape_value(value: &str) -> String {
    let count = value.chars().count();
    let mut result = String::with_capacity(value.len() + 8);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}

/// Split on `separator` where it is not preceded by an escape.
fn split_unescaped(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if ch == separator {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    parts.push(current);
    parts
}

fn unescape_value(value: &str) -> Result<String, String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        match &bytes[i + 1..] {
            [high, low, ..] if high.is_ascii_hexdigit() && low.is_ascii_hexdigit() => {
                out.push(hex_digit(*high) << 4 | hex_digit(*low));
                i += 3;
            }
            [escaped, ..] => {
                out.push(*escaped);
                i += 2;
            }
            [] => return Err("trailing escape character".to_string()),
        }
    }

    String::from_utf8(out).map_err(|_| "escaped value is not valid UTF-8".to_string())
}

fn hex_digit(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        _ => byte - b'A' + 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_components() {
        let dn = Dn::parse("uid=alex, ou=people,dc=example,dc=com").unwrap();
        assert_eq!(dn.depth(), 4);
        assert_eq!(dn.rdn().unwrap().attribute(), "uid");
        assert_eq!(dn.rdn().unwrap().value(), "alex");
        assert_eq!(dn.to_string(), "uid=alex, ou=people,dc=example,dc=com");
    }

    #[test]
    fn test_equality_is_normalized() {
        let a = Dn::parse("CN=Alex,DC=Example").unwrap();
        let b = Dn::parse("cn=alex, dc=example").unwrap();
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_parent_and_child() {
        let base = Dn::parse("ou=people,dc=example").unwrap();
        let child = base.child("cn", "Mathieu, Alex");

        assert_eq!(child.to_string(), "cn=Mathieu\\, Alex,ou=people,dc=example");
        assert_eq!(child.rdn().unwrap().value(), "Mathieu, Alex");
        assert_eq!(child.parent().unwrap(), base);
        assert!(child.is_descendant_of(&base));
        assert!(!base.is_descendant_of(&child));
        assert!(base.is_within(&base));
        assert!(Dn::root().parent().is_none());
    }

    #[test]
    fn test_escaped_roundtrip() {
        let base = Dn::parse("dc=example").unwrap();
        let child = base.child("cn", " #a=b+c ");
        let reparsed = Dn::parse(child.as_str()).unwrap();
        assert_eq!(reparsed.rdn().unwrap().value(), " #a=b+c ");
        assert_eq!(reparsed, child);
    }

    #[test]
    fn test_hex_escape() {
        let dn = Dn::parse("cn=caf\\C3\\A9,dc=example").unwrap();
        assert_eq!(dn.rdn().unwrap().value(), "café");
    }

    #[test]
    fn test_suffix_does_not_match_partial_component() {
        let base = Dn::parse("dc=example").unwrap();
        let other = Dn::parse("cn=x,dc=bigexample").unwrap();
        assert!(!other.is_descendant_of(&base));
        assert!(other.is_descendant_of(&Dn::root()));
    }

    #[test]
    fn test_invalid_names() {
        assert!(Dn::parse("cn").is_err());
        assert!(Dn::parse("=alex,dc=example").is_err());
        assert!(Dn::parse("cn=alex\\").is_err());
        assert!(Dn::parse("").unwrap().is_root());
    }
}
