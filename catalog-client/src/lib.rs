//! # Catalog Client SDK
//!
//! A typed Rust client for the product catalog API.

use catalog_types::{
    CreateProductRequest, ErrorBody, FieldError, PageResponse, ProductResponse,
    ValidationErrorBody,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} {error} - {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Validation failed: {}", describe(.0))]
    Validation(Vec<FieldError>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Paging options for [`CatalogClient::list_products`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// `property(,asc|desc)`
    pub sort: Option<String>,
}

/// Catalog API client.
pub struct CatalogClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl CatalogClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: Client::new(),
        }
    }

    /// Sets the bearer token sent with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Creates a new product.
    pub async fn create_product(
        &self,
        req: &CreateProductRequest,
    ) -> Result<ProductResponse, ClientError> {
        let builder = self
            .http
            .post(format!("{}/api/v1/products", self.base_url))
            .json(req);
        self.send(builder).await
    }

    /// Gets a product by code.
    pub async fn get_product(&self, code: &str) -> Result<ProductResponse, ClientError> {
        let builder = self
            .http
            .get(format!("{}/api/v1/products/{}", self.base_url, code));
        self.send(builder).await
    }

    /// Lists one page of products.
    pub async fn list_products(
        &self,
        options: &ListOptions,
    ) -> Result<PageResponse<ProductResponse>, ClientError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(page) = options.page {
            query.push(("page", page.to_string()));
        }
        if let Some(size) = options.size {
            query.push(("size", size.to_string()));
        }
        if let Some(sort) = &options.sort {
            query.push(("sort", sort.clone()));
        }

        let builder = self
            .http
            .get(format!("{}/api/v1/products", self.base_url))
            .query(&query);
        self.send(builder).await
    }

    async fn send<T: DeserializeOwned>(&self, mut builder: RequestBuilder) -> Result<T, ClientError> {
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let resp = builder.send().await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        let body = resp.text().await?;
        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        if let Ok(validation) = serde_json::from_str::<ValidationErrorBody>(&body) {
            return Err(ClientError::Validation(validation.errors));
        }

        let (error, message) = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { error, message }) => (error, message),
            Err(_) => (
                status.canonical_reason().unwrap_or("Unknown").to_string(),
                body,
            ),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            error,
            message,
        })
    }
}
