//! HTTP Server configuration and startup.

use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use catalog_types::{ProductRepository, TokenValidator};
use exchange_rates::RateSource;

use super::auth::auth_middleware;
use super::handlers::{self, AppState, PRODUCTS_PATH};
use crate::ProductService;
use crate::openapi::ApiDoc;

/// HTTP Server for the Catalog API.
pub struct HttpServer<R: ProductRepository, S: RateSource> {
    state: Arc<AppState<R, S>>,
}

impl<R: ProductRepository, S: RateSource> HttpServer<R, S> {
    /// Creates a new HTTP server with the given service and token validator.
    pub fn new(service: ProductService<R, S>, validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            state: Arc::new(AppState { service, validator }),
        }
    }

    /// Builds the Axum router with all routes.
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/health", get(handlers::health))
            .route(
                PRODUCTS_PATH,
                get(handlers::list_products::<R, S>).post(handlers::create_product::<R, S>),
            )
            .route(
                &format!("{PRODUCTS_PATH}/{{code}}"),
                get(handlers::get_product::<R, S>),
            )
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth_middleware::<R, S>,
            ))
            .with_state(self.state.clone());

        api.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address with graceful shutdown.
    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown...");
}
