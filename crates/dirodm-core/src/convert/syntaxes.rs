//! Built-in syntax converters.

use super::{Syntax, SyntaxConverter};
use crate::error::ConversionError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use dirodm_proto::Dn;

fn malformed(syntax: Syntax, value: &str, reason: impl ToString) -> ConversionError {
    ConversionError::Malformed {
        syntax,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Text as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryStringConverter;

impl SyntaxConverter for DirectoryStringConverter {
    type Wire = String;
    type Value = String;

    const SYNTAX: Syntax = Syntax::DirectoryString;

    fn to_wire(&self, value: String) -> Result<String, ConversionError> {
        Ok(value)
    }

    fn from_wire(&self, wire: String) -> Result<String, ConversionError> {
        Ok(wire)
    }
}

/// Decimal integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerConverter;

impl SyntaxConverter for IntegerConverter {
    type Wire = String;
    type Value = i64;

    const SYNTAX: Syntax = Syntax::Integer;

    fn to_wire(&self, value: i64) -> Result<String, ConversionError> {
        Ok(value.to_string())
    }

    fn from_wire(&self, wire: String) -> Result<i64, ConversionError> {
        wire.trim()
            .parse()
            .map_err(|e| malformed(Self::SYNTAX, &wire, e))
    }
}

/// `TRUE` / `FALSE`; decoding ignores case.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanConverter;

impl SyntaxConverter for BooleanConverter {
    type Wire = String;
    type Value = bool;

    const SYNTAX: Syntax = Syntax::Boolean;

    fn to_wire(&self, value: bool) -> Result<String, ConversionError> {
        Ok(if value { "TRUE" } else { "FALSE" }.to_string())
    }

    fn from_wire(&self, wire: String) -> Result<bool, ConversionError> {
        if wire.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if wire.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(malformed(Self::SYNTAX, &wire, "expected TRUE or FALSE"))
        }
    }
}

/// Bytes as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct OctetStringConverter;

impl SyntaxConverter for OctetStringConverter {
    type Wire = Vec<u8>;
    type Value = Vec<u8>;

    const SYNTAX: Syntax = Syntax::OctetString;

    fn to_wire(&self, value: Vec<u8>) -> Result<Vec<u8>, ConversionError> {
        Ok(value)
    }

    fn from_wire(&self, wire: Vec<u8>) -> Result<Vec<u8>, ConversionError> {
        Ok(wire)
    }
}

/// Text stored as UTF-8 bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryStringConverter;

impl SyntaxConverter for BinaryStringConverter {
    type Wire = Vec<u8>;
    type Value = String;

    const SYNTAX: Syntax = Syntax::BinaryString;

    fn to_wire(&self, value: String) -> Result<Vec<u8>, ConversionError> {
        Ok(value.into_bytes())
    }

    fn from_wire(&self, wire: Vec<u8>) -> Result<String, ConversionError> {
        String::from_utf8(wire)
            .map_err(|e| malformed(Self::SYNTAX, &hex::encode(e.as_bytes()), "not valid UTF-8"))
    }
}

/// Generalized time (`YYYYMMDDHHMMSS[.fff]Z` or with a numeric offset).
///
/// Encoding always produces UTC with a `Z` suffix.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralizedTimeConverter;

const GENERALIZED_TIME: &str = "%Y%m%d%H%M%S%.f";

impl SyntaxConverter for GeneralizedTimeConverter {
    type Wire = String;
    type Value = DateTime<Utc>;

    const SYNTAX: Syntax = Syntax::GeneralizedTime;

    fn to_wire(&self, value: DateTime<Utc>) -> Result<String, ConversionError> {
        Ok(format!("{}Z", value.format(GENERALIZED_TIME)))
    }

    fn from_wire(&self, wire: String) -> Result<DateTime<Utc>, ConversionError> {
        let text = wire.trim();
        if let Some(local) = text.strip_suffix(['Z', 'z']) {
            let naive = NaiveDateTime::parse_from_str(local, GENERALIZED_TIME)
                .map_err(|e| malformed(Self::SYNTAX, &wire, e))?;
            return Ok(Utc.from_utc_datetime(&naive));
        }
        DateTime::parse_from_str(text, "%Y%m%d%H%M%S%.f%z")
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| malformed(Self::SYNTAX, &wire, e))
    }
}

/// Distinguished names.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnConverter;

impl SyntaxConverter for DnConverter {
    type Wire = String;
    type Value = Dn;

    const SYNTAX: Syntax = Syntax::DistinguishedName;

    fn to_wire(&self, value: Dn) -> Result<String, ConversionError> {
        Ok(value.to_string())
    }

    fn from_wire(&self, wire: String) -> Result<Dn, ConversionError> {
        Dn::parse(&wire).map_err(|e| malformed(Self::SYNTAX, &wire, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer() {
        assert_eq!(IntegerConverter.to_wire(42).unwrap(), "42");
        assert_eq!(IntegerConverter.from_wire("42".into()).unwrap(), 42);
        assert_eq!(IntegerConverter.from_wire(" -3 ".into()).unwrap(), -3);
        assert!(matches!(
            IntegerConverter.from_wire("forty-two".into()),
            Err(ConversionError::Malformed { syntax: Syntax::Integer, .. })
        ));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(BooleanConverter.to_wire(true).unwrap(), "TRUE");
        assert!(!BooleanConverter.from_wire("false".into()).unwrap());
        assert!(BooleanConverter.from_wire("yes".into()).is_err());
    }

    #[test]
    fn test_binary_string() {
        let bytes = BinaryStringConverter.to_wire("café".into()).unwrap();
        assert_eq!(bytes, "café".as_bytes());
        assert_eq!(BinaryStringConverter.from_wire(bytes).unwrap(), "café");
        assert!(BinaryStringConverter.from_wire(vec![0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_generalized_time() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap();
        let wire = GeneralizedTimeConverter.to_wire(time).unwrap();
        assert_eq!(wire, "20240309140500Z");
        assert_eq!(GeneralizedTimeConverter.from_wire(wire).unwrap(), time);

        let offset = GeneralizedTimeConverter
            .from_wire("20240309160500+0200".into())
            .unwrap();
        assert_eq!(offset, time);

        let fractional = GeneralizedTimeConverter
            .from_wire("20240309140500.250Z".into())
            .unwrap();
        assert_eq!(fractional.timestamp_subsec_millis(), 250);
        assert!(GeneralizedTimeConverter.from_wire("yesterday".into()).is_err());
    }

    #[test]
    fn test_dn() {
        let dn = DnConverter.from_wire("CN=Alex,DC=Example".into()).unwrap();
        assert_eq!(dn, Dn::parse("cn=alex,dc=example").unwrap());
        assert!(DnConverter.from_wire("not a name".into()).is_err());
    }
}
