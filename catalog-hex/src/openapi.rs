//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use catalog_types::dto::{
    CreateProductRequest, ErrorBody, PageResponse, ProductResponse, ValidationErrorBody,
};
use catalog_types::error::FieldError;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Create a new product
///
/// The response carries the product priced in USD at today's exchange rate.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "products",
    request_body = CreateProductRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Product created", body = ProductResponse,
            headers(("Location" = String, description = "URL of the created product"))),
        (status = 400, description = "Invalid product data", body = ValidationErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 409, description = "Product code already exists", body = ErrorBody)
    )
)]
async fn create_product() {}

/// Get a product by code
#[utoipa::path(
    get,
    path = "/api/v1/products/{code}",
    tag = "products",
    params(
        ("code" = String, Path, description = "Product code, exactly 10 characters", example = "PRODUCT001")
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 400, description = "Malformed product code", body = ValidationErrorBody),
        (status = 404, description = "Product not found", body = ErrorBody)
    )
)]
async fn get_product() {}

/// List products one page at a time
#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "products",
    params(
        ("page" = Option<u32>, Query, description = "Page number (0-based)", example = 0),
        ("size" = Option<u32>, Query, description = "Page size, 1 to 100", example = 20),
        ("sort" = Option<String>, Query, description = "Sort as `property(,asc|desc)`; one of id, code, name, price_eur, available", example = "price_eur,desc")
    ),
    responses(
        (status = 200, description = "Page of products", body = PageResponse<ProductResponse>),
        (status = 400, description = "Invalid paging parameters", body = ValidationErrorBody)
    )
)]
async fn list_products() {}

/// OpenAPI documentation for the Catalog API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Product Catalog API",
        version = "1.0.0",
        description = "Product catalog with prices derived in USD from the daily EUR exchange rate.\n\n## Authentication\n\nCreating products requires a Bearer token issued by the operator through the `API_TOKENS` setting:\n\n```\nAuthorization: Bearer <token>\n```",
        license(name = "MIT"),
    ),
    paths(health, create_product, get_product, list_products),
    components(
        schemas(
            CreateProductRequest,
            ProductResponse,
            PageResponse<ProductResponse>,
            ErrorBody,
            ValidationErrorBody,
            FieldError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "products", description = "Product catalog operations"),
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for Bearer token authentication.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
