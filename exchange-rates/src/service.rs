//! Cache-first rate lookups that never fail.

use std::error::Error as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::cache::RateCache;
use crate::currency::{RateCurrency, RateKey};
use crate::enricher::RateSource;
use crate::error::RateLookupError;
use crate::gateway::RateGateway;

/// Orchestrates cache → gateway (normally breaker-wrapped) → cache populate.
///
/// Every failure is logged and turned into `None`; callers only ever see a
/// rate or its absence.
pub struct ExchangeRateService<G> {
    gateway: G,
    cache: Arc<dyn RateCache>,
}

impl<G: RateGateway> ExchangeRateService<G> {
    pub fn new(gateway: G, cache: Arc<dyn RateCache>) -> Self {
        Self { gateway, cache }
    }

    pub fn cache(&self) -> &Arc<dyn RateCache> {
        &self.cache
    }

    /// Mid rate of `currency` against EUR on `date`, if one can be obtained.
    pub async fn get_rate(&self, currency: RateCurrency, date: NaiveDate) -> Option<Decimal> {
        let key = RateKey::new(currency, date);

        if let Some(rate) = self.cache.get(&key) {
            debug!(cache = self.cache.name(), %key, "Exchange rate cache hit");
            return Some(rate);
        }

        match self.gateway.fetch_rate(key).await {
            Ok(rate) => {
                self.cache.put(key, rate);
                Some(rate)
            }
            Err(RateLookupError::Unavailable(reason)) => {
                error!(%key, "{reason}");
                None
            }
            Err(RateLookupError::CallBlocked(reason)) => {
                info!(%key, "{reason}");
                None
            }
            Err(RateLookupError::Unexpected { message, cause }) => {
                let detail = cause
                    .source()
                    .map(|source| source.to_string())
                    .unwrap_or_default();
                error!(
                    %key,
                    error = &cause as &(dyn std::error::Error + 'static),
                    %detail,
                    timeout = cause.is_timeout(),
                    "{message}"
                );
                None
            }
        }
    }

    pub async fn get_eur_to_usd_rate(&self, date: NaiveDate) -> Option<Decimal> {
        self.get_rate(RateCurrency::USD, date).await
    }
}

#[async_trait]
impl<G: RateGateway + 'static> RateSource for ExchangeRateService<G> {
    async fn rate(&self, currency: RateCurrency, date: NaiveDate) -> Option<Decimal> {
        self.get_rate(currency, date).await
    }
}
