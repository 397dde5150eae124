//! Currencies quoted by the exchange-rate provider and the lookup key built from them.

use std::fmt;

use chrono::NaiveDate;

// ─────────────────────────────────────────────────────────────────────────────
// THE MACRO: Defines the quoted currencies and their code lookups
// ─────────────────────────────────────────────────────────────────────────────

/// Generates [`RateCurrency`] together with its code/symbol tables and parsing.
///
/// # Syntax
/// ```ignore
/// define_currencies! {
///     CurrencyName => ("CODE", "SYMBOL"),
/// }
/// ```
macro_rules! define_currencies {
    (
        $(
            $name:ident => ($code:literal, $symbol:literal)
        ),* $(,)?
    ) => {
        /// A currency whose mid rate against EUR can be looked up.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(rename_all = "UPPERCASE")]
        pub enum RateCurrency {
            $($name),*
        }

        impl RateCurrency {
            /// ISO 4217 code, as sent to the provider.
            pub fn code(&self) -> &'static str {
                match self {
                    $(RateCurrency::$name => $code),*
                }
            }

            pub fn symbol(&self) -> &'static str {
                match self {
                    $(RateCurrency::$name => $symbol),*
                }
            }

            pub fn all() -> &'static [RateCurrency] {
                &[$(RateCurrency::$name),*]
            }
        }

        impl std::str::FromStr for RateCurrency {
            type Err = UnknownCurrency;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($code => Ok(RateCurrency::$name),)*
                    _ => Err(UnknownCurrency(s.to_string())),
                }
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// CURRENCY DEFINITIONS - currencies the provider publishes against EUR
// ─────────────────────────────────────────────────────────────────────────────

define_currencies! {
    USD => ("USD", "$"),
    GBP => ("GBP", "£"),
    CHF => ("CHF", "CHF"),
    JPY => ("JPY", "¥"),
    AUD => ("AUD", "A$"),
    CAD => ("CAD", "C$"),
    CZK => ("CZK", "Kč"),
    DKK => ("DKK", "kr"),
    HUF => ("HUF", "Ft"),
    NOK => ("NOK", "kr"),
    PLN => ("PLN", "zł"),
    SEK => ("SEK", "kr"),
    BAM => ("BAM", "KM"),
}

impl fmt::Display for RateCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Returned when a currency code is not quoted by the provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown currency: {0}")]
pub struct UnknownCurrency(pub String);

// ─────────────────────────────────────────────────────────────────────────────
// Lookup key
// ─────────────────────────────────────────────────────────────────────────────

/// A (currency, calendar date) pair identifying one published mid rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateKey {
    currency: RateCurrency,
    date: NaiveDate,
}

impl RateKey {
    pub fn new(currency: RateCurrency, date: NaiveDate) -> Self {
        Self { currency, date }
    }

    pub fn currency(&self) -> RateCurrency {
        self.currency
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for RateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.currency, self.date)
    }
}
