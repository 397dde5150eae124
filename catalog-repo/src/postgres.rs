//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::PgPool;

use catalog_types::{
    NewProduct, Page, PageRequest, Product, ProductCode, ProductRepository, RepoError,
};

use crate::types::{DbProduct, PRODUCT_COLUMNS, db_error, insert_error, order_by};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository implementation.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_products_pg.sql"),
        "0001",
    )
    .await
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ProductRepository for PostgresRepo {
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepoError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO products (code, name, price_eur, available) VALUES ($1, $2, $3, $4) RETURNING id"#,
        )
        .bind(product.code.as_str())
        .bind(&product.name)
        .bind(product.price_eur)
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
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = $1");
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
            "SELECT {PRODUCT_COLUMNS} FROM products {} LIMIT $1 OFFSET $2",
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
