//! Bearer token middleware for write endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use catalog_types::{AppError, ProductRepository};
use exchange_rates::RateSource;

use super::handlers::{ApiError, AppState, PRODUCTS_PATH};

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively.
fn extract_bearer(auth_header: Option<&str>) -> Option<&str> {
    let (scheme, token) = auth_header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Whether the request needs a bearer token.
///
/// Only product creation is protected; reads, health and docs are public.
fn requires_auth(method: &Method, path: &str) -> bool {
    method == Method::POST && path.trim_end_matches('/') == PRODUCTS_PATH
}

/// Authentication middleware that validates bearer tokens.
///
/// Returns 401 Unauthorized when the token is missing or unknown, and 500
/// when the validator itself fails.
pub async fn auth_middleware<R: ProductRepository, S: RateSource>(
    State(state): State<Arc<AppState<R, S>>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !requires_auth(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match extract_bearer(auth_header) {
        Some(token) => token,
        None => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    match state.validator.validate(token).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            tracing::warn!(path = %request.uri().path(), "Rejected bearer token");
            unauthorized_response("Invalid bearer token")
        }
        Err(e) => ApiError(AppError::from(e)).into_response(),
    }
}

fn unauthorized_response(message: &str) -> Response {
    ApiError(AppError::Unauthorized(message.into())).into_response()
}
