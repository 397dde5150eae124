//! Decimal parsing for the provider's German-locale number format.
//!
//! The provider publishes rates as strings using `.` as the group separator and
//! `,` as the decimal separator, e.g. `"1.234,56"`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// The rate field did not contain a number in the expected locale format.
///
/// This is a contract violation by the provider, not a missing rate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Failed to parse decimal '{input}' with ',' as decimal separator and '.' as group separator"
)]
pub struct MalformedRate {
    input: String,
}

impl MalformedRate {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_string(),
        }
    }

    /// The raw text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Parses a German-locale decimal string.
///
/// ```
/// use exchange_rates::format::parse_locale_decimal;
///
/// assert_eq!(parse_locale_decimal("1.234,56").unwrap().to_string(), "1234.56");
/// assert!(parse_locale_decimal("not_a_number").is_err());
/// ```
pub fn parse_locale_decimal(input: &str) -> Result<Decimal, MalformedRate> {
    let trimmed = input.trim();

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let (integer, fraction) = unsigned.split_once(',').unwrap_or((unsigned, ""));

    // Group separators may only sit between digits.
    if integer.starts_with('.') || integer.ends_with('.') || integer.contains("..") {
        return Err(MalformedRate::new(input));
    }

    let digits: String = integer.chars().filter(|c| *c != '.').collect();
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());

    if !all_digits(digits.as_str())
        || !all_digits(fraction)
        || (digits.is_empty() && fraction.is_empty())
    {
        return Err(MalformedRate::new(input));
    }

    let mut canonical = String::with_capacity(digits.len() + fraction.len() + 3);
    if negative {
        canonical.push('-');
    }
    canonical.push_str(if digits.is_empty() { "0" } else { &digits });
    if !fraction.is_empty() {
        canonical.push('.');
        canonical.push_str(fraction);
    }

    Decimal::from_str(&canonical).map_err(|_| MalformedRate::new(input))
}

/// `serde` adapter for fields carrying a German-locale decimal string.
pub fn deserialize_locale_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_locale_decimal(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_group_and_decimal_separator() {
        assert_eq!(parse_locale_decimal("1.234,56").unwrap(), dec!(1234.56));
    }

    #[test]
    fn test_only_decimal_separator() {
        assert_eq!(parse_locale_decimal("123,45").unwrap(), dec!(123.45));
    }

    #[test]
    fn test_only_group_separator() {
        assert_eq!(parse_locale_decimal("1.000").unwrap(), dec!(1000));
    }

    #[test]
    fn test_provider_precision_is_kept() {
        let rate = parse_locale_decimal("1,03920").unwrap();
        assert_eq!(rate, dec!(1.0392));
        assert_eq!(rate.scale(), 5);
    }

    #[test]
    fn test_signs_and_whitespace() {
        assert_eq!(parse_locale_decimal(" -0,5 ").unwrap(), dec!(-0.5));
        assert_eq!(parse_locale_decimal("+7").unwrap(), dec!(7));
        assert_eq!(parse_locale_decimal(",25").unwrap(), dec!(0.25));
    }

    #[test]
    fn test_non_numeric_is_malformed() {
        let err = parse_locale_decimal("not_a_number").unwrap_err();
        assert_eq!(err.input(), "not_a_number");
    }

    #[test]
    fn test_rejects_misplaced_separators() {
        for input in ["", ",", ".1", "1.", "1..000", "1,2,3", "1,2.3", "1.2a", "--1"] {
            assert!(
                parse_locale_decimal(input).is_err(),
                "{input:?} should not parse"
            );
        }
    }

    #[test]
    fn test_deserialize_field() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(deserialize_with = "deserialize_locale_decimal")]
            rate: Decimal,
        }

        let row: Row = serde_json::from_str(r#"{"rate":"1.234,56"}"#).unwrap();
        assert_eq!(row.rate, dec!(1234.56));

        let err = serde_json::from_str::<Row>(r#"{"rate":"abc"}"#)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to parse decimal 'abc'"));
    }
}
