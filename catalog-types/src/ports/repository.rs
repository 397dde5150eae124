//! Repository port trait.
//!
//! Adapters (Postgres, SQLite, in-memory fakes) implement this trait.

use crate::domain::{NewProduct, Page, PageRequest, Product, ProductCode};
use crate::error::RepoError;

/// Storage for catalog products.
///
/// Product codes are unique; inserting a duplicate must fail with
/// [`RepoError::Conflict`].
#[async_trait::async_trait]
pub trait ProductRepository: Send + Sync + 'static {
    /// Inserts a product and returns it with its assigned id.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepoError>;

    async fn find_by_code(&self, code: &ProductCode) -> Result<Option<Product>, RepoError>;

    /// Returns one page of products in the requested order (by id when unsorted).
    async fn list_products(&self, request: &PageRequest) -> Result<Page<Product>, RepoError>;
}
