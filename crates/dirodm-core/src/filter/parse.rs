//! Parser for the textual filter grammar (RFC 4515).
//!
//! Supports and/or/not, equality, ordering, approximate, presence and
//! substring items. Extensible matching is not supported.

use super::{Comparison, Filter};
use dirodm_proto::RawValue;
use std::str::FromStr;
use thiserror::Error;

/// Malformed filter text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid filter at offset {position}: {reason}")]
pub struct ParseError {
    pub position: usize,
    pub reason: String,
}

impl Filter {
    /// Parse filter text.
    pub fn parse(text: &str) -> Result<Filter, ParseError> {
        let mut parser = Parser { text, pos: 0 };
        let filter = parser.filter()?;
        parser.skip_whitespace();
        if parser.pos != text.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(filter)
    }
}

impl FromStr for Filter {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> ParseError {
        ParseError {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn filter(&mut self) -> Result<Filter, ParseError> {
        self.skip_whitespace();
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::and(self.list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::or(self.list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::not(self.filter()?)
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.skip_whitespace();
        self.expect(b')')?;
        Ok(filter)
    }

    fn list(&mut self) -> Result<Vec<Filter>, ParseError> {
        let mut filters = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'(') {
                return Ok(filters);
            }
            filters.push(self.filter()?);
        }
    }

    fn item(&mut self) -> Result<Filter, ParseError> {
        let text = self.text;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'=' | b'~' | b'>' | b'<' | b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        let attribute = text[start..self.pos].trim();
        if attribute.is_empty() {
            return Err(self.error("missing attribute description"));
        }

        let op = match self.peek() {
            Some(b'=') => Comparison::Equals,
            Some(b'~') => Comparison::Approx,
            Some(b'>') => Comparison::GreaterOrEqual,
            Some(b'<') => Comparison::LessOrEqual,
            _ => return Err(self.error("missing comparison operator")),
        };
        self.pos += 1;
        if op != Comparison::Equals {
            self.expect(b'=')?;
        }

        let value_start = self.pos;
        while let Some(b) = self.peek() {
            match b {
                b')' => break,
                b'(' => return Err(self.error("unescaped '(' in assertion value")),
                _ => self.pos += 1,
            }
        }
        let raw = &text[value_start..self.pos];

        if has_wildcard(raw) {
            if op != Comparison::Equals {
                return Err(self.error("wildcard outside an equality item"));
            }
            if raw == "*" {
                return Ok(Filter::present(attribute));
            }
            for piece in split_wildcards(raw) {
                unescape(piece).map_err(|reason| self.error(reason))?;
            }
            return Ok(Filter::raw(attribute, op, raw));
        }

        let value = unescape(raw).map_err(|reason| self.error(reason))?;
        Ok(Filter::compare(attribute, op, value))
    }
}

/// Check for an unescaped `*`.
pub(crate) fn has_wildcard(raw: &str) -> bool {
    raw.contains('*')
}

/// Split an assertion value on `*`.
///
/// Escaped asterisks are written `\2a`, so a literal `*` is always a wildcard.
pub(crate) fn split_wildcards(raw: &str) -> Vec<&str> {
    raw.split('*').collect()
}

/// Decode `\xx` escapes; values that are not UTF-8 come back binary.
pub(crate) fn unescape(raw: &str) -> Result<RawValue, String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let pair = bytes
            .get(i + 1..i + 3)
            .and_then(|p| std::str::from_utf8(p).ok())
            .and_then(|p| u8::from_str_radix(p, 16).ok())
            .ok_or_else(|| "invalid escape sequence".to_string())?;
        out.push(pair);
        i += 3;
    }
    Ok(match String::from_utf8(out) {
        Ok(text) => RawValue::Text(text),
        Err(e) => RawValue::Binary(e.into_bytes()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compound() {
        let f = Filter::parse("(&(objectClass=person)(|(cn=alex)(sn=mathieu))(!(mail=*)))").unwrap();
        assert_eq!(
            f,
            Filter::and([
                Filter::equals("objectClass", "person"),
                Filter::or([Filter::equals("cn", "alex"), Filter::equals("sn", "mathieu")]),
                Filter::not(Filter::present("mail")),
            ])
        );
    }

    #[test]
    fn test_parse_operators() {
        assert_eq!(
            Filter::parse("(uidNumber>=1000)").unwrap(),
            Filter::greater_or_equal("uidNumber", "1000")
        );
        assert_eq!(
            Filter::parse("(uidNumber<=9)").unwrap(),
            Filter::less_or_equal("uidNumber", "9")
        );
        assert_eq!(Filter::parse("(sn~=smith)").unwrap(), Filter::approx("sn", "smith"));
    }

    #[test]
    fn test_parse_substring() {
        assert_eq!(
            Filter::parse("(cn=al*x*)").unwrap(),
            Filter::raw("cn", Comparison::Equals, "al*x*")
        );
        assert!(Filter::parse("(cn>=a*)").is_err());
    }

    #[test]
    fn test_escapes_roundtrip() {
        let original = Filter::equals("cn", "a*(b)\\");
        let parsed = Filter::parse(&original.encode()).unwrap();
        assert_eq!(parsed, original);

        let binary = Filter::equals("jpegPhoto", vec![0xffu8, 0x00]);
        assert_eq!(Filter::parse(&binary.encode()).unwrap(), binary);
    }

    #[test]
    fn test_whitespace_and_empty_and() {
        assert_eq!(
            Filter::parse(" (& (cn=a) (sn=b) ) ").unwrap(),
            Filter::and([Filter::equals("cn", "a"), Filter::equals("sn", "b")])
        );
        assert_eq!(Filter::parse("(&)").unwrap(), Filter::And(vec![]));
    }

    #[test]
    fn test_invalid() {
        for text in ["", "cn=a", "(cn=a", "(=a)", "(cn)", "(cn=a)(sn=b)", "(cn=\\zz)", "(cn=(a)"] {
            assert!(Filter::parse(text).is_err(), "{} should not parse", text);
        }
    }
}
