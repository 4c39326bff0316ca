//! Price levels with string-tuple wire encoding
//!
//! The upstream feed and the downstream protocol both carry levels as
//! two-element arrays of decimal strings (`["100.0", "2.0"]`). Prices and
//! sizes are `Decimal` in memory so they order and compare exactly; the
//! string form round-trips scale (a "100.0" in stays a "100.0" out).

use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// A single (price, size) pair on one side of a book.
///
/// A size of zero is a tombstone meaning "remove this level"; the book
/// store never holds a zero-size level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl PriceLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }

    /// Whether this level is a removal tombstone.
    pub fn is_tombstone(&self) -> bool {
        self.size.is_zero()
    }
}

impl Serialize for PriceLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.price.to_string(), self.size.to_string()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PriceLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (price, size): (String, String) = Deserialize::deserialize(deserializer)?;
        let price = Decimal::from_str(&price)
            .map_err(|e| D::Error::custom(format!("invalid price {:?}: {}", price, e)))?;
        let size = Decimal::from_str(&size)
            .map_err(|e| D::Error::custom(format!("invalid size {:?}: {}", size, e)))?;
        Ok(Self { price, size })
    }
}

/// An unparsed (price, size) string pair as received from the feed.
///
/// Diffs keep the raw strings so one malformed field skips only its own
/// level, never the whole message.
pub type RawLevel = (String, String);

/// Parse a raw level into decimals. None if either field is unparsable.
pub fn parse_raw_level(raw: &RawLevel) -> Option<PriceLevel> {
    let price = Decimal::from_str(&raw.0).ok()?;
    let size = Decimal::from_str(&raw.1).ok()?;
    Some(PriceLevel { price, size })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_serializes_as_string_tuple() {
        let level = PriceLevel::new(
            Decimal::from_str("100.0").unwrap(),
            Decimal::from_str("2.0").unwrap(),
        );
        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(json, r#"["100.0","2.0"]"#);
    }

    #[test]
    fn test_level_roundtrips_scale() {
        let level: PriceLevel = serde_json::from_str(r#"["1940.50","0.250"]"#).unwrap();
        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(json, r#"["1940.50","0.250"]"#);
    }

    #[test]
    fn test_level_rejects_bad_numbers() {
        assert!(serde_json::from_str::<PriceLevel>(r#"["abc","2.0"]"#).is_err());
        assert!(serde_json::from_str::<PriceLevel>(r#"["100.0",""]"#).is_err());
    }

    #[test]
    fn test_tombstone() {
        let level: PriceLevel = serde_json::from_str(r#"["100.0","0"]"#).unwrap();
        assert!(level.is_tombstone());

        let level: PriceLevel = serde_json::from_str(r#"["100.0","0.1"]"#).unwrap();
        assert!(!level.is_tombstone());
    }

    #[test]
    fn test_parse_raw_level() {
        let good: RawLevel = ("100.0".to_string(), "2.0".to_string());
        assert!(parse_raw_level(&good).is_some());

        let bad: RawLevel = ("not-a-number".to_string(), "2.0".to_string());
        assert!(parse_raw_level(&bad).is_none());
    }
}
