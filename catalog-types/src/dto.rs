//! Data Transfer Objects (DTOs) for requests and responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Page;
use crate::error::FieldError;

// ─────────────────────────────────────────────────────────────────────────────
// Product DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a new product.
///
/// Every field is optional on the wire so that missing values are reported
/// as field errors alongside the other validation failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    /// Unique product code, exactly 10 characters long
    #[schema(example = "PRODUCT001", min_length = 10, max_length = 10)]
    pub code: Option<String>,
    /// Name of the product
    #[schema(example = "Wireless Mouse", max_length = 255)]
    pub name: Option<String>,
    /// Price of the product in EUR
    #[schema(value_type = f64, example = 10.99, minimum = 0.01, maximum = 9999999999.99)]
    pub price_eur: Option<Decimal>,
    /// Whether the product is available; defaults to false
    #[serde(default)]
    pub available: Option<bool>,
}

/// A product as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    #[schema(example = "PRODUCT001")]
    pub code: String,
    #[schema(example = "Wireless Mouse")]
    pub name: String,
    /// Price in EUR
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 10.99)]
    pub price_eur: Decimal,
    /// Price in USD at today's rate; null when no rate could be obtained
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>, example = 11.42)]
    pub price_usd: Option<Decimal>,
    pub available: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Paging DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Paginated response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageResponse<T> {
    /// Items on the current page
    pub content: Vec<T>,
    /// Current page number (0-based)
    #[schema(example = 0)]
    pub page: u32,
    #[schema(example = 10)]
    pub total_pages: u32,
    /// Requested page size
    #[schema(example = 20)]
    pub size: u32,
    #[schema(example = 20)]
    pub number_of_elements: u32,
    #[schema(example = 200)]
    pub total_elements: u64,
    pub first: bool,
    pub last: bool,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            total_pages: page.total_pages(),
            number_of_elements: page.number_of_elements(),
            first: page.is_first(),
            last: page.is_last(),
            page: page.page,
            size: page.size,
            total_elements: page.total_elements,
            content: page.content,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Error DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Error kind
    #[schema(example = "NotFound")]
    pub error: String,
    #[schema(example = "Product with code PRODUCT001 not found.")]
    pub message: String,
}

/// Validation failure response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationErrorBody {
    pub errors: Vec<FieldError>,
}
