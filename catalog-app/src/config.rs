//! Configuration loading from environment.

use std::env;
use std::time::Duration;

use anyhow::Context;
use exchange_rates::{
    CacheBackend, CacheConfig, CircuitBreakerConfig, DEFAULT_BREAKER_NAME, GatewayConfig,
};

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Bearer tokens accepted for write requests.
    pub api_tokens: Vec<String>,
    pub json_logs: bool,
    pub gateway: GatewayConfig,
    pub breaker_name: String,
    pub breaker: CircuitBreakerConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Unset and blank variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&var, "PORT", 3000)?;

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let api_tokens = var("API_TOKENS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let json_logs = var("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        let defaults = GatewayConfig::default();
        let gateway = GatewayConfig {
            url_template: var("EXCHANGE_RATE_API_URL_TEMPLATE").unwrap_or(defaults.url_template),
            timeout: millis_or(&var, "EXCHANGE_RATE_API_TIMEOUT_MS", defaults.timeout)?,
            connect_timeout: millis_or(
                &var,
                "EXCHANGE_RATE_API_CONNECT_TIMEOUT_MS",
                defaults.connect_timeout,
            )?,
        };

        let defaults = CircuitBreakerConfig::default();
        let breaker = CircuitBreakerConfig {
            minimum_calls: parse_or(&var, "CIRCUIT_BREAKER_MINIMUM_CALLS", defaults.minimum_calls)?,
            failure_rate_threshold: parse_or(
                &var,
                "CIRCUIT_BREAKER_FAILURE_RATE_THRESHOLD",
                defaults.failure_rate_threshold,
            )?,
            wait_duration_in_open: Duration::from_secs(parse_or(
                &var,
                "CIRCUIT_BREAKER_WAIT_DURATION_SECS",
                defaults.wait_duration_in_open.as_secs(),
            )?),
            permitted_calls_in_half_open: parse_or(
                &var,
                "CIRCUIT_BREAKER_PERMITTED_CALLS_IN_HALF_OPEN",
                defaults.permitted_calls_in_half_open,
            )?,
        };
        anyhow::ensure!(
            CircuitBreakerConfig::is_valid_threshold(breaker.failure_rate_threshold),
            "Invalid value for CIRCUIT_BREAKER_FAILURE_RATE_THRESHOLD: {} (expected a percentage in (0, 100])",
            breaker.failure_rate_threshold
        );
        let breaker_name =
            var("CIRCUIT_BREAKER_NAME").unwrap_or_else(|| DEFAULT_BREAKER_NAME.to_string());

        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            name: var("EXCHANGE_RATE_CACHE_NAME").unwrap_or(defaults.name),
            backend: parse_or(&var, "EXCHANGE_RATE_CACHE_BACKEND", CacheBackend::default())?,
            max_entries: parse_or(&var, "EXCHANGE_RATE_CACHE_MAX_ENTRIES", defaults.max_entries)?,
        };

        Ok(Self {
            port,
            database_url,
            api_tokens,
            json_logs,
            gateway,
            breaker_name,
            breaker,
            cache,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        None => Ok(default),
    }
}

fn millis_or<F>(var: &F, key: &str, default: Duration) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(var, key, default_ms).map(Duration::from_millis)
}
