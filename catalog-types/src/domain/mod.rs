//! Domain models for the catalog service.

pub mod page;
pub mod product;

pub use page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, Sort, SortDirection, SortField};
pub use product::{MAX_NAME_LENGTH, NewProduct, PRODUCT_CODE_LENGTH, Product, ProductCode};
