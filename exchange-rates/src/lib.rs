//! Resilient EUR Exchange-Rate Lookups
//!
//! Looks up the daily mid rate of a currency against EUR from an external
//! provider and turns it into a derived price. The pieces compose explicitly:
//!
//! ```text
//! HttpRateGateway → CircuitBreakingGateway → ExchangeRateService → PriceEnricher
//!                                                   ↕
//!                                               RateCache
//! ```
//!
//! Lookups never fail from the caller's point of view: every failure mode is
//! logged and collapses to `None`.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//!
//! use exchange_rates::{
//!     CacheConfig, CircuitBreakerRegistry, CircuitBreakingGateway, ExchangeRateService,
//!     GatewayConfig, HttpRateGateway, PriceEnricher, build_cache,
//! };
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> Result<(), reqwest::Error> {
//! let registry = CircuitBreakerRegistry::default();
//! let gateway = CircuitBreakingGateway::new(
//!     HttpRateGateway::new(GatewayConfig::default())?,
//!     registry.get_or_create("exchange-rate-api"),
//! );
//! let service = Arc::new(ExchangeRateService::new(
//!     gateway,
//!     build_cache(&CacheConfig::default()),
//! ));
//!
//! let enricher = PriceEnricher::new(service);
//! let today = chrono::Local::now().date_naive();
//! let usd = enricher.usd_price(Some(Decimal::new(10000, 2)), today).await;
//! # Ok(())
//! # }
//! ```

pub mod breaker;
pub mod cache;
pub mod currency;
pub mod enricher;
pub mod error;
pub mod format;
pub mod gateway;
pub mod service;

pub use breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitBreakingGateway,
    CircuitMetrics, CircuitState, DEFAULT_BREAKER_NAME, Permit,
};
pub use cache::{
    CacheBackend, CacheConfig, DEFAULT_CACHE_NAME, InMemoryRateCache, NoopRateCache, RateCache,
    UnknownCacheBackend, build_cache,
};
pub use currency::{RateCurrency, RateKey, UnknownCurrency};
pub use enricher::{PriceEnricher, RateSource};
pub use error::{FailureCause, RateLookupError, RateLookupResult};
pub use format::{MalformedRate, parse_locale_decimal};
pub use gateway::{DEFAULT_URL_TEMPLATE, GatewayConfig, HttpRateGateway, RateGateway};
pub use service::ExchangeRateService;
