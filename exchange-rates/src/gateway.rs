//! HTTP gateway to the exchange-rate provider.
//!
//! One GET per lookup. The provider answers with a JSON array that must hold
//! exactly one entry for the requested currency and date:
//!
//! ```text
//! [{"valuta":"USD","srednji_tecaj":"1,039200", ...}]
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::ACCEPT};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::currency::RateKey;
use crate::error::{FailureCause, RateLookupError, RateLookupResult};
use crate::format::deserialize_locale_decimal;

/// Default provider endpoint (Croatian National Bank, rates against EUR).
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://api.hnb.hr/tecajn-eur/v3?valuta={currency}&datum-primjene={date}";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Port for anything that can look up a single published rate.
#[async_trait]
pub trait RateGateway: Send + Sync {
    async fn fetch_rate(&self, key: RateKey) -> RateLookupResult;
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// URL with `{currency}` and `{date}` placeholders.
    pub url_template: String,
    /// Whole-request timeout (connect + response + body).
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// One element of the provider response.
#[derive(Debug, Deserialize)]
struct RateEntry {
    #[serde(rename = "srednji_tecaj", deserialize_with = "deserialize_locale_decimal")]
    middle_rate: Decimal,
}

/// `reqwest`-backed gateway.
pub struct HttpRateGateway {
    client: Client,
    url_template: String,
}

impl HttpRateGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            url_template: config.url_template,
        })
    }

    /// Expands the URL template for a key.
    pub fn request_url(&self, key: RateKey) -> String {
        self.url_template
            .replace("{currency}", key.currency().code())
            .replace("{date}", &key.date().format("%Y-%m-%d").to_string())
    }
}

#[async_trait]
impl RateGateway for HttpRateGateway {
    async fn fetch_rate(&self, key: RateKey) -> RateLookupResult {
        let (currency, date) = (key.currency(), key.date());
        let unexpected = |cause: FailureCause| RateLookupError::Unexpected {
            message: format!(
                "Unexpected error happened. Exchange rate is not fetched for currency {} on date {}.",
                currency, date
            ),
            cause,
        };

        let url = self.request_url(key);
        debug!(%url, "Requesting exchange rate");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| unexpected(FailureCause::Transport(e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RateLookupError::Unavailable(format!(
                "Failed to fetch exchange rate for currency {} on date {}. Status code: {}.",
                currency,
                date,
                status.as_u16()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unexpected(FailureCause::Transport(e)))?;

        let entries: Option<Vec<RateEntry>> = serde_json::from_slice(&body)
            .map_err(|e| unexpected(FailureCause::MalformedPayload(e)))?;

        match entries.unwrap_or_default().as_slice() {
            [] => Err(RateLookupError::Unavailable(format!(
                "Exchange rate not sent for currency {} on date {}.",
                currency, date
            ))),
            [entry] => {
                debug!(%currency, %date, rate = %entry.middle_rate, "Exchange rate received");
                Ok(entry.middle_rate)
            }
            _ => Err(RateLookupError::Unavailable(format!(
                "Multiple exchange rates sent for currency {} on date {}.",
                currency, date
            ))),
        }
    }
}
