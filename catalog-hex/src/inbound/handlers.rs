//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use catalog_types::{
    AppError, CreateProductRequest, ErrorBody, PageRequest, ProductRepository, TokenValidator,
    ValidationErrorBody,
};
use exchange_rates::RateSource;

use crate::ProductService;

/// Base path of the product resource.
pub const PRODUCTS_PATH: &str = "/api/v1/products";

/// Application state shared across handlers.
pub struct AppState<R: ProductRepository, S: RateSource> {
    pub service: ProductService<R, S>,
    pub validator: Arc<dyn TokenValidator>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let kind = self.0.kind();
        match self.0 {
            AppError::Validation(errors) => {
                (status, Json(ValidationErrorBody { errors })).into_response()
            }
            AppError::Internal(_) => (
                status,
                Json(ErrorBody {
                    error: kind.into(),
                    message: "Internal server error".into(),
                }),
            )
                .into_response(),
            AppError::NotFound(message)
            | AppError::Conflict(message)
            | AppError::Unauthorized(message) => (
                status,
                Json(ErrorBody {
                    error: kind.into(),
                    message,
                }),
            )
                .into_response(),
        }
    }
}

/// Query string of the list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Create a product.
#[tracing::instrument(skip(state, req))]
pub async fn create_product<R: ProductRepository, S: RateSource>(
    State(state): State<Arc<AppState<R, S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.service.create_product(req).await?;
    let location = format!("{}/{}", PRODUCTS_PATH, product.code);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(product),
    ))
}

/// Get a product by code.
#[tracing::instrument(skip(state), fields(code = %code))]
pub async fn get_product<R: ProductRepository, S: RateSource>(
    State(state): State<Arc<AppState<R, S>>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.service.get_product(&code).await?;
    Ok(Json(product))
}

/// List one page of products.
#[tracing::instrument(skip(state))]
pub async fn list_products<R: ProductRepository, S: RateSource>(
    State(state): State<Arc<AppState<R, S>>>,
    Query(params): Query<ListProductsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::new(params.page, params.size, params.sort.as_deref())
        .map_err(AppError::from)?;

    let page = state.service.list_products(request).await?;
    Ok(Json(page))
}
