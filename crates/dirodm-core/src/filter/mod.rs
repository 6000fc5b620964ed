//! Directory search filters.
//!
//! [`Filter`] is a tree of comparisons combined with and/or/not. It renders
//! to the textual filter grammar (RFC 4515) with assertion values escaped, so
//! a filter built from user input can never change shape on the wire.
//! Nested conjunctions and disjunctions are flattened as they are combined.

mod builder;
mod evaluate;
mod parse;

pub use builder::{FilterBuilder, PropertyFilterBuilder};
pub use evaluate::{wildcard_match, FilterEvaluator};
pub use parse::ParseError;

use dirodm_proto::RawValue;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Comparison operators of a filter item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equals,
    GreaterOrEqual,
    LessOrEqual,
    Approx,
}

impl Comparison {
    /// The operator as written in filter text.
    pub fn operator(&self) -> &'static str {
        match self {
            Comparison::Equals => "=",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessOrEqual => "<=",
            Comparison::Approx => "~=",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator())
    }
}

/// A search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Compare an attribute with a value; the value is escaped on encoding.
    Compare {
        attribute: String,
        op: Comparison,
        value: RawValue,
    },
    /// Compare with pre-encoded text inserted verbatim (wildcards allowed).
    Raw {
        attribute: String,
        op: Comparison,
        raw: String,
    },
    /// The attribute has at least one value.
    Present { attribute: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn compare(attribute: impl Into<String>, op: Comparison, value: impl Into<RawValue>) -> Self {
        Filter::Compare {
            attribute: attribute.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(attribute: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self::compare(attribute, Comparison::Equals, value)
    }

    pub fn greater_or_equal(attribute: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self::compare(attribute, Comparison::GreaterOrEqual, value)
    }

    pub fn less_or_equal(attribute: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self::compare(attribute, Comparison::LessOrEqual, value)
    }

    pub fn approx(attribute: impl Into<String>, value: impl Into<RawValue>) -> Self {
        Self::compare(attribute, Comparison::Approx, value)
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// Comparison with caller-encoded text, e.g. a substring pattern.
    pub fn raw(attribute: impl Into<String>, op: Comparison, raw: impl Into<String>) -> Self {
        Filter::Raw {
            attribute: attribute.into(),
            op,
            raw: raw.into(),
        }
    }

    /// Conjunction; nested conjunctions are flattened.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut children = Vec::new();
        for filter in filters {
            absorb(&mut children, filter, true);
        }
        Filter::And(children)
    }

    /// Disjunction; nested disjunctions are flattened.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut children = Vec::new();
        for filter in filters {
            absorb(&mut children, filter, false);
        }
        Filter::Or(children)
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    /// Combine with another filter under a conjunction.
    pub fn and_with(self, other: Filter) -> Self {
        match self {
            Filter::And(mut children) => {
                absorb(&mut children, other, true);
                Filter::And(children)
            }
            this => Filter::and([this, other]),
        }
    }

    /// Combine with another filter under a disjunction.
    pub fn or_with(self, other: Filter) -> Self {
        match self {
            Filter::Or(mut children) => {
                absorb(&mut children, other, false);
                Filter::Or(children)
            }
            this => Filter::or([this, other]),
        }
    }

    /// Render to filter text.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Names of all attributes the filter tests.
    pub fn referenced_attributes(&self) -> BTreeSet<String> {
        let mut attributes = BTreeSet::new();
        self.collect_attributes(&mut attributes);
        attributes
    }

    fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        match self {
            Filter::Compare { attribute, .. }
            | Filter::Raw { attribute, .. }
            | Filter::Present { attribute } => {
                out.insert(attribute.clone());
            }
            Filter::And(children) | Filter::Or(children) => {
                for child in children {
                    child.collect_attributes(out);
                }
            }
            Filter::Not(child) => child.collect_attributes(out),
        }
    }
}

fn absorb(children: &mut Vec<Filter>, filter: Filter, conjunction: bool) {
    match filter {
        Filter::And(nested) if conjunction => children.extend(nested),
        Filter::Or(nested) if !conjunction => children.extend(nested),
        other => children.push(other),
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.and_with(rhs)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.or_with(rhs)
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare {
                attribute,
                op,
                value,
            } => write!(f, "({}{}{})", attribute, op, escape_raw_value(value)),
            Filter::Raw { attribute, op, raw } => write!(f, "({}{}{})", attribute, op, raw),
            Filter::Present { attribute } => write!(f, "({}=*)", attribute),
            Filter::And(children) => {
                f.write_str("(&")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Filter::Or(children) => {
                f.write_str("(|")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
            Filter::Not(child) => write!(f, "(!{})", child),
        }
    }
}

/// Escape text for use as a filter assertion value (RFC 4515).
pub fn escape_assertion_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(ch),
        }
    }
    result
}

/// Escape every byte of a binary assertion value.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 3);
    for byte in bytes {
        result.push('\\');
        result.push_str(&hex::encode([*byte]));
    }
    result
}

fn escape_raw_value(value: &RawValue) -> String {
    match value {
        RawValue::Text(text) => escape_assertion_value(text),
        RawValue::Binary(bytes) => escape_bytes(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_items() {
        assert_eq!(Filter::equals("cn", "alex").encode(), "(cn=alex)");
        assert_eq!(Filter::greater_or_equal("uidNumber", "1000").encode(), "(uidNumber>=1000)");
        assert_eq!(Filter::approx("sn", "mathew").encode(), "(sn~=mathew)");
        assert_eq!(Filter::present("mail").encode(), "(mail=*)");
        assert_eq!(
            Filter::raw("cn", Comparison::Equals, "al*").encode(),
            "(cn=al*)"
        );
    }

    #[test]
    fn test_values_are_escaped() {
        assert_eq!(
            Filter::equals("cn", "a*b(c)\\d").encode(),
            "(cn=a\\2ab\\28c\\29\\5cd)"
        );
        assert_eq!(
            Filter::equals("cn", "*)(uid=*))(|(uid=*").encode(),
            "(cn=\\2a\\29\\28uid=\\2a\\29\\29\\28|\\28uid=\\2a)"
        );
        assert_eq!(
            Filter::equals("jpegPhoto", vec![0x00u8, 0xff, 0x2a]).encode(),
            "(jpegPhoto=\\00\\ff\\2a)"
        );
    }

    #[test]
    fn test_nested_composites_flatten() {
        let f = Filter::and([
            Filter::and([Filter::equals("a", "1"), Filter::equals("b", "2")]),
            Filter::equals("c", "3"),
        ]);
        assert_eq!(f.encode(), "(&(a=1)(b=2)(c=3))");

        let f = Filter::or([Filter::equals("a", "1")]).or_with(Filter::or([
            Filter::equals("b", "2"),
            Filter::equals("c", "3"),
        ]));
        assert_eq!(f.encode(), "(|(a=1)(b=2)(c=3))");

        let mixed = Filter::and([Filter::or([Filter::equals("a", "1")]), Filter::equals("b", "2")]);
        assert_eq!(mixed.encode(), "(&(|(a=1))(b=2))");
    }

    #[test]
    fn test_operators() {
        let f = Filter::equals("a", "1") & Filter::equals("b", "2") & Filter::equals("c", "3");
        assert_eq!(f.encode(), "(&(a=1)(b=2)(c=3))");

        let f = Filter::equals("a", "1") | Filter::equals("b", "2");
        assert_eq!(f.encode(), "(|(a=1)(b=2))");

        assert_eq!(Filter::not(Filter::present("mail")).encode(), "(!(mail=*))");

        let f = Filter::equals("a", "1") & !Filter::present("mail");
        assert_eq!(f.encode(), "(&(a=1)(!(mail=*)))");
    }

    #[test]
    fn test_referenced_attributes() {
        let f = Filter::and([
            Filter::equals("objectClass", "person"),
            Filter::not(Filter::present("mail")),
            Filter::or([Filter::equals("cn", "a"), Filter::equals("sn", "b")]),
        ]);
        let attrs: Vec<_> = f.referenced_attributes().into_iter().collect();
        assert_eq!(attrs, vec!["cn", "mail", "objectClass", "sn"]);
    }
}
