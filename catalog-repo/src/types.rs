//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use catalog_types::{Product, ProductCode, RepoError, Sort, SortDirection, SortField};

#[cfg(feature = "sqlite")]
use std::str::FromStr;

#[cfg(not(feature = "sqlite"))]
use rust_decimal::Decimal;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

pub const PRODUCT_COLUMNS: &str = "id, code, name, price_eur, available";

/// Product row from database.
#[derive(FromRow)]
pub struct DbProduct {
    pub id: i64,
    pub code: String,
    pub name: String,

    // SQLite has no exact decimal type; prices are kept as canonical text.
    #[cfg(not(feature = "sqlite"))]
    pub price_eur: Decimal,
    #[cfg(feature = "sqlite")]
    pub price_eur: String,

    pub available: bool,
}

impl DbProduct {
    pub fn into_domain(self) -> Result<Product, RepoError> {
        let code: ProductCode = self.code.parse().map_err(|e| {
            RepoError::Database(format!("Corrupt code for product {}: {}", self.id, e))
        })?;

        #[cfg(feature = "sqlite")]
        let price_eur = rust_decimal::Decimal::from_str(&self.price_eur).map_err(|e| {
            RepoError::Database(format!(
                "Corrupt price '{}' for product {}: {}",
                self.price_eur, self.id, e
            ))
        })?;
        #[cfg(not(feature = "sqlite"))]
        let price_eur = self.price_eur;

        Ok(Product {
            id: self.id,
            code,
            name: self.name,
            price_eur,
            available: self.available,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Query helpers
// ─────────────────────────────────────────────────────────────────────────────

/// ORDER BY clause for a listing. Columns come from a fixed map, never from input.
pub fn order_by(sort: Option<Sort>) -> String {
    let Some(sort) = sort else {
        return "ORDER BY id ASC".to_string();
    };

    let column = match sort.field {
        SortField::Id => "id",
        SortField::Code => "code",
        SortField::Name => "name",
        #[cfg(feature = "sqlite")]
        SortField::PriceEur => "CAST(price_eur AS REAL)",
        #[cfg(not(feature = "sqlite"))]
        SortField::PriceEur => "price_eur",
        SortField::Available => "available",
    };
    let direction = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };

    if sort.field == SortField::Id {
        format!("ORDER BY id {direction}")
    } else {
        format!("ORDER BY {column} {direction}, id ASC")
    }
}

/// Maps an INSERT failure, turning unique-constraint violations into conflicts.
pub fn insert_error(err: sqlx::Error, code: &ProductCode) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(format!(
            "Product with code {} already exists.",
            code
        )),
        _ => RepoError::Database(err.to_string()),
    }
}

pub fn db_error(err: sqlx::Error) -> RepoError {
    RepoError::Database(err.to_string())
}
