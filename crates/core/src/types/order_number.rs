//! Human-readable order identifiers (`ORD-2026-482913`).

use core::fmt;

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Error returned when an order number does not have the `ORD-YYYY-N` shape.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid order number: {0}")]
pub struct InvalidOrderNumber(pub String);

/// Customer-facing order identifier, also the primary key of `orders`.
///
/// Freshly generated numbers use a six-digit random suffix, so two orders in
/// the same year can collide. Writers must treat a unique violation as
/// "generate another one and retry".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    const PREFIX: &'static str = "ORD-";

    /// Lowest random suffix (inclusive).
    pub const SUFFIX_MIN: u32 = 100_000;
    /// Highest random suffix (inclusive).
    pub const SUFFIX_MAX: u32 = 999_999;

    /// Generate a new order number for the year of `now`.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = rand::rng().random_range(Self::SUFFIX_MIN..=Self::SUFFIX_MAX);
        Self::from_parts(now.year(), suffix)
    }

    /// Build an order number from its year and numeric suffix.
    #[must_use]
    pub fn from_parts(year: i32, suffix: u32) -> Self {
        Self(format!("{}{year:04}-{suffix}", Self::PREFIX))
    }

    /// Parse and validate an order number.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOrderNumber`] unless the input is `ORD-` followed by a
    /// four-digit year, a dash, and one or more digits.
    pub fn parse(s: &str) -> Result<Self, InvalidOrderNumber> {
        let invalid = || InvalidOrderNumber(s.to_owned());
        let rest = s.strip_prefix(Self::PREFIX).ok_or_else(invalid)?;
        let (year, suffix) = rest.split_once('-').ok_or_else(invalid)?;

        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || !all_digits(year) || !all_digits(suffix) {
            return Err(invalid());
        }

        Ok(Self(s.to_owned()))
    }

    /// The order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Year component.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.0
            .strip_prefix(Self::PREFIX)
            .and_then(|rest| rest.get(..4))
            .and_then(|year| year.parse().ok())
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderNumber {
    type Error = InvalidOrderNumber;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrderNumber> for String {
    fn from(value: OrderNumber) -> Self {
        value.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_generate_shape() {
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 10, 0, 0).unwrap();
        for _ in 0..100 {
            let number = OrderNumber::generate(now);
            let s = number.as_str();
            assert!(s.starts_with("ORD-2026-"), "{s}");
            let suffix: u32 = s.trim_start_matches("ORD-2026-").parse().unwrap();
            assert!((OrderNumber::SUFFIX_MIN..=OrderNumber::SUFFIX_MAX).contains(&suffix));
            assert_eq!(number.year(), Some(2026));
        }
    }

    #[test]
    fn test_parse_accepts_legacy_short_suffix() {
        assert!(OrderNumber::parse("ORD-2025-42").is_ok());
        assert!(OrderNumber::parse("ORD-2026-123456").is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(OrderNumber::parse("").is_err());
        assert!(OrderNumber::parse("ORD-26-123456").is_err());
        assert!(OrderNumber::parse("ORD-2026-").is_err());
        assert!(OrderNumber::parse("ORD-2026-12a").is_err());
        assert!(OrderNumber::parse("INV-2026-123456").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let parsed: OrderNumber = serde_json::from_str("\"ORD-2026-100001\"").unwrap();
        assert_eq!(parsed, OrderNumber::from_parts(2026, 100_001));
        assert!(serde_json::from_str::<OrderNumber>("\"nope\"").is_err());
    }
}
