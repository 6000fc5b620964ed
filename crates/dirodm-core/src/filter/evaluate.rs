//! Filter evaluation against directory entries.

use super::parse::{has_wildcard, split_wildcards, unescape};
use super::{Comparison, Filter};
use dirodm_proto::{DirectoryEntry, Dn, RawValue};
use std::cmp::Ordering;

/// Evaluates filters against entries held in memory.
///
/// Text matching ignores case; values that look like distinguished names
/// also match by normalized name, and integers order numerically.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Check if an entry matches a filter.
    pub fn matches(filter: &Filter, entry: &DirectoryEntry) -> bool {
        match filter {
            Filter::Compare {
                attribute,
                op,
                value,
            } => Self::compare_attribute(entry, attribute, *op, value),
            Filter::Raw { attribute, op, raw } => {
                if *op == Comparison::Equals && has_wildcard(raw) {
                    return entry
                        .values(attribute)
                        .iter()
                        .filter_map(RawValue::as_text)
                        .any(|v| wildcard_match(v, raw));
                }
                match unescape(raw) {
                    Ok(value) => Self::compare_attribute(entry, attribute, *op, &value),
                    Err(_) => false,
                }
            }
            Filter::Present { attribute } => entry.has_attribute(attribute),
            Filter::And(children) => children.iter().all(|f| Self::matches(f, entry)),
            Filter::Or(children) => children.iter().any(|f| Self::matches(f, entry)),
            Filter::Not(child) => !Self::matches(child, entry),
        }
    }

    fn compare_attribute(
        entry: &DirectoryEntry,
        attribute: &str,
        op: Comparison,
        asserted: &RawValue,
    ) -> bool {
        entry.values(attribute).iter().any(|stored| match op {
            Comparison::Equals => Self::values_equal(stored, asserted),
            Comparison::GreaterOrEqual => Self::compare_values(stored, asserted).is_ge(),
            Comparison::LessOrEqual => Self::compare_values(stored, asserted).is_le(),
            Comparison::Approx => Self::approx_equal(stored, asserted),
        })
    }

    fn values_equal(a: &RawValue, b: &RawValue) -> bool {
        match (a.as_text(), b.as_text()) {
            (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase() || Self::names_equal(a, b),
            _ => a.as_bytes() == b.as_bytes(),
        }
    }

    fn names_equal(a: &str, b: &str) -> bool {
        if !a.contains('=') || !b.contains('=') {
            return false;
        }
        matches!((Dn::parse(a), Dn::parse(b)), (Ok(a), Ok(b)) if a == b)
    }

    fn compare_values(a: &RawValue, b: &RawValue) -> Ordering {
        match (a.as_text(), b.as_text()) {
            (Some(a), Some(b)) => match (a.trim().parse::<i64>(), b.trim().parse::<i64>()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.to_lowercase().cmp(&b.to_lowercase()),
            },
            _ => a.as_bytes().cmp(b.as_bytes()),
        }
    }

    fn approx_equal(a: &RawValue, b: &RawValue) -> bool {
        let squash = |s: &str| -> String {
            s.chars()
                .filter(|c| !c.is_whitespace())
                .flat_map(char::to_lowercase)
                .collect()
        };
        match (a.as_text(), b.as_text()) {
            (Some(a), Some(b)) => squash(a) == squash(b),
            _ => a.as_bytes() == b.as_bytes(),
        }
    }
}

/// Match text against a substring pattern (`*` wildcards, `\xx` escapes).
///
/// Matching ignores case. Patterns with undecodable pieces match nothing.
pub fn wildcard_match(value: &str, pattern: &str) -> bool {
    let mut pieces = Vec::new();
    for piece in split_wildcards(pattern) {
        match unescape(piece) {
            Ok(RawValue::Text(text)) => pieces.push(text.to_lowercase()),
            _ => return false,
        }
    }
    let value = value.to_lowercase();

    let Some((first, rest)) = pieces.split_first() else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return value == *first;
    };

    if value.len() < first.len() + last.len()
        || !value.starts_with(first.as_str())
        || !value.ends_with(last.as_str())
    {
        return false;
    }

    let end = value.len() - last.len();
    let mut pos = first.len();
    for piece in middle.iter().filter(|p| !p.is_empty()) {
        match value[pos..end].find(piece.as_str()) {
            Some(i) => pos += i + piece.len(),
            None => return false,
        }
    }
    true
}
