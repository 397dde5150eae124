//! SQLite repository adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use catalog_types::{
    NewProduct, Page, PageRequest, Product, ProductCode, ProductRepository, RepoError,
};

use crate::types::{DbProduct, PRODUCT_COLUMNS, db_error, insert_error, order_by};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` opens its own empty database.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect_with(options)
            .await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (idempotent).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_products.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ProductRepository for SqliteRepo {
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepoError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO products (code, name, price_eur, available) VALUES (?, ?, ?, ?) RETURNING id"#,
        )
        .bind(product.code.as_str())
        .bind(&product.name)
        .bind(product.price_eur.to_string())
        .bind(product.available)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| insert_error(e, &product.code))?;

        tracing::debug!(id, code = %product.code, "Inserted product");

        Ok(Product {
            id,
            code: product.code,
            name: product.name,
            price_eur: product.price_eur,
            available: product.available,
        })
    }

    async fn find_by_code(&self, code: &ProductCode) -> Result<Option<Product>, RepoError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?");
        let row: Option<DbProduct> = sqlx::query_as(&sql)
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(DbProduct::into_domain).transpose()
    }

    async fn list_products(&self, request: &PageRequest) -> Result<Page<Product>, RepoError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products {} LIMIT ? OFFSET ?",
            order_by(request.sort)
        );
        let rows: Vec<DbProduct> = sqlx::query_as(&sql)
            .bind(request.limit())
            .bind(request.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let content = rows
            .into_iter()
            .map(DbProduct::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(content, request, u64::try_from(total).unwrap_or(0)))
    }
}
