//! # Catalog Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the repository adapter
//! - Assemble the exchange-rate stack (gateway, circuit breaker, cache)
//! - Create the product service
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_hex::{ProductService, inbound::HttpServer};
use catalog_repo::{StaticTokenValidator, build_repo};
use exchange_rates::{
    CircuitBreakerRegistry, CircuitBreakingGateway, ExchangeRateService, HttpRateGateway,
    build_cache,
};

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,catalog_app=debug,catalog_hex=debug,exchange_rates=debug".into()
    });

    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = config::Config::from_env()?;
    init_tracing(config.json_logs);

    tracing::info!("Starting catalog server on port {}", config.port);

    // Build repository (handles connection and migration)
    let repo = build_repo(&config.database_url).await?;

    // Exchange-rate stack: HTTP gateway guarded by a named breaker, fronted by the cache
    let registry = CircuitBreakerRegistry::new(config.breaker.clone());
    let breaker = registry.get_or_create(&config.breaker_name);
    let gateway = CircuitBreakingGateway::new(HttpRateGateway::new(config.gateway.clone())?, breaker);
    let cache = build_cache(&config.cache);
    tracing::info!(
        breaker = %config.breaker_name,
        cache = %config.cache.name,
        backend = %config.cache.backend,
        "Exchange rate lookups configured"
    );
    let rates = Arc::new(ExchangeRateService::new(gateway, cache));

    let service = ProductService::new(repo, rates);

    let validator = StaticTokenValidator::from_tokens(&config.api_tokens);
    if validator.is_empty() {
        tracing::warn!("API_TOKENS is empty; product creation will be rejected");
    }

    // Create and run the HTTP server
    let server = HttpServer::new(service, Arc::new(validator));
    let addr = format!("0.0.0.0:{}", config.port);

    server.run(&addr).await?;

    Ok(())
}
