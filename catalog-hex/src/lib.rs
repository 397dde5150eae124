//! # Catalog Hex
//!
//! Application service layer and HTTP adapter for the product catalog.
//!
//! ## Architecture
//!
//! - `service/` - Application service (validation, lookups, USD enrichment)
//! - `inbound/` - HTTP adapter (Axum server, bearer auth)
//! - `openapi/` - OpenAPI document served next to Swagger UI
//!
//! The service is generic over `R: ProductRepository` and `S: RateSource`,
//! allowing different repositories and rate providers to be injected.

pub mod inbound;
pub mod openapi;
pub mod service;


pub use service::ProductService;
