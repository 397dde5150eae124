//! Product domain model.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dto::CreateProductRequest;
use crate::error::{DomainError, FieldError};

/// Product codes are fixed-width.
pub const PRODUCT_CODE_LENGTH: usize = 10;

pub const MAX_NAME_LENGTH: usize = 255;

/// Prices carry at most 10 integer and 2 fraction digits.
const MAX_PRICE_SCALE: u32 = 2;
const PRICE_UPPER_BOUND: i64 = 10_000_000_000;

const MSG_NOT_BLANK: &str = "must not be blank";
const MSG_NOT_NULL: &str = "must not be null";
const MSG_CODE_LENGTH: &str = "must be exactly 10 characters long";
const MSG_NAME_LENGTH: &str = "must be up to 255 characters long";
const MSG_PRICE_POSITIVE: &str = "must be greater than 0.0";
const MSG_PRICE_DIGITS: &str =
    "must be less or equal to 9999999999.99 and have up to 2 decimal places";

/// Unique business identifier of a product: exactly 10 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    fn check(raw: &str) -> Result<(), &'static str> {
        if raw.trim().is_empty() {
            Err(MSG_NOT_BLANK)
        } else if raw.chars().count() != PRODUCT_CODE_LENGTH {
            Err(MSG_CODE_LENGTH)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::check(s)
            .map(|_| Self(s.to_string()))
            .map_err(|msg| DomainError::Validation(vec![FieldError::new("code", msg)]))
    }
}

impl TryFrom<String> for ProductCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProductCode> for String {
    fn from(code: ProductCode) -> Self {
        code.0
    }
}

/// A persisted catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Database identity
    pub id: i64,
    pub code: ProductCode,
    pub name: String,
    /// Price in EUR, scale 2
    pub price_eur: Decimal,
    pub available: bool,
}

/// A product that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub code: ProductCode,
    pub name: String,
    pub price_eur: Decimal,
    pub available: bool,
}

impl NewProduct {
    /// Validates a create request, reporting every invalid field at once.
    ///
    /// # Validation
    /// - `code`: not blank, exactly 10 characters
    /// - `name`: not blank, at most 255 characters
    /// - `price_eur`: present, > 0, at most 10 integer and 2 fraction digits
    pub fn validate(req: CreateProductRequest) -> Result<Self, DomainError> {
        let mut errors = Vec::new();

        let code = match req.code {
            Some(code) => match ProductCode::check(&code) {
                Ok(()) => Some(ProductCode(code)),
                Err(msg) => {
                    errors.push(FieldError::new("code", msg));
                    None
                }
            },
            None => {
                errors.push(FieldError::new("code", MSG_NOT_BLANK));
                None
            }
        };

        let name = match req.name {
            Some(name) if name.trim().is_empty() => {
                errors.push(FieldError::new("name", MSG_NOT_BLANK));
                None
            }
            Some(name) if name.chars().count() > MAX_NAME_LENGTH => {
                errors.push(FieldError::new("name", MSG_NAME_LENGTH));
                None
            }
            Some(name) => Some(name),
            None => {
                errors.push(FieldError::new("name", MSG_NOT_BLANK));
                None
            }
        };

        let price_eur = match req.price_eur {
            None => {
                errors.push(FieldError::new("price_eur", MSG_NOT_NULL));
                None
            }
            Some(price) if price <= Decimal::ZERO => {
                errors.push(FieldError::new("price_eur", MSG_PRICE_POSITIVE));
                None
            }
            Some(price)
                if price.normalize().scale() > MAX_PRICE_SCALE
                    || price >= Decimal::from(PRICE_UPPER_BOUND) =>
            {
                errors.push(FieldError::new("price_eur", MSG_PRICE_DIGITS));
                None
            }
            Some(mut price) => {
                price.rescale(MAX_PRICE_SCALE);
                Some(price)
            }
        };

        match (code, name, price_eur) {
            (Some(code), Some(name), Some(price_eur)) if errors.is_empty() => Ok(Self {
                code,
                name,
                price_eur,
                available: req.available.unwrap_or(false),
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}
