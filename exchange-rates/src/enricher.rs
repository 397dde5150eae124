//! Derived USD prices for outbound product representations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::currency::RateCurrency;

/// Anything that can answer "what was the EUR rate of this currency on this date".
#[async_trait]
pub trait RateSource: Send + Sync + 'static {
    async fn rate(&self, currency: RateCurrency, date: NaiveDate) -> Option<Decimal>;
}

#[async_trait]
impl<T: RateSource + ?Sized> RateSource for Arc<T> {
    async fn rate(&self, currency: RateCurrency, date: NaiveDate) -> Option<Decimal> {
        (**self).rate(currency, date).await
    }
}

/// Converts EUR prices to USD at the day's mid rate.
#[derive(Clone)]
pub struct PriceEnricher<S> {
    rates: S,
}

impl<S: RateSource> PriceEnricher<S> {
    pub fn new(rates: S) -> Self {
        Self { rates }
    }

    /// `price_eur × rate`, rounded to cents half away from zero.
    ///
    /// `None` when there is no price (no lookup is made), no rate, or the
    /// product overflows.
    pub async fn usd_price(&self, price_eur: Option<Decimal>, date: NaiveDate) -> Option<Decimal> {
        let price_eur = price_eur?;
        let rate = self.usd_rate(date).await;
        Self::convert(Some(price_eur), rate)
    }

    /// The USD rate for `date`, for callers converting many prices at once.
    pub async fn usd_rate(&self, date: NaiveDate) -> Option<Decimal> {
        self.rates.rate(RateCurrency::USD, date).await
    }

    /// Applies an already resolved rate.
    pub fn convert(price_eur: Option<Decimal>, rate: Option<Decimal>) -> Option<Decimal> {
        price_eur?
            .checked_mul(rate?)
            .map(|usd| usd.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRate {
        rate: Option<Decimal>,
        lookups: AtomicUsize,
    }

    impl FixedRate {
        fn new(rate: Option<Decimal>) -> Arc<Self> {
            Arc::new(Self {
                rate,
                lookups: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RateSource for FixedRate {
        async fn rate(&self, currency: RateCurrency, _date: NaiveDate) -> Option<Decimal> {
            assert_eq!(currency, RateCurrency::USD);
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.rate
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_converts_and_rounds() {
        let rates = FixedRate::new(Some(dec!(1.1)));
        let enricher = PriceEnricher::new(rates.clone());

        let usd = enricher.usd_price(Some(dec!(100.00)), today()).await.unwrap();
        assert_eq!(usd, dec!(110.00));
        assert_eq!(usd.to_string(), "110.00");
        assert_eq!(rates.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_midpoint_rounds_away_from_zero() {
        let enricher = PriceEnricher::new(FixedRate::new(Some(dec!(1.5))));

        // 0.05 × 1.5 = 0.075
        assert_eq!(
            enricher.usd_price(Some(dec!(0.05)), today()).await,
            Some(dec!(0.08))
        );
        assert_eq!(
            enricher.usd_price(Some(dec!(12.34)), today()).await,
            Some(dec!(18.51))
        );
    }

    #[tokio::test]
    async fn test_missing_price_skips_lookup() {
        let rates = FixedRate::new(Some(dec!(1.1)));
        let enricher = PriceEnricher::new(rates.clone());

        assert_eq!(enricher.usd_price(None, today()).await, None);
        assert_eq!(rates.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_rate_gives_none() {
        let enricher = PriceEnricher::new(FixedRate::new(None));
        assert_eq!(enricher.usd_price(Some(dec!(10)), today()).await, None);
    }

    #[tokio::test]
    async fn test_resolved_rate_is_reused() {
        let rates = FixedRate::new(Some(dec!(1.1)));
        let enricher = PriceEnricher::new(rates.clone());

        let rate = enricher.usd_rate(today()).await;
        let usd: Vec<_> = [Some(dec!(100)), None, Some(dec!(0.05))]
            .into_iter()
            .map(|price| PriceEnricher::<Arc<FixedRate>>::convert(price, rate))
            .collect();

        assert_eq!(usd, vec![Some(dec!(110.00)), None, Some(dec!(0.06))]);
        assert_eq!(rates.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(PriceEnricher::<Arc<FixedRate>>::convert(Some(dec!(1)), None), None);
    }
}
