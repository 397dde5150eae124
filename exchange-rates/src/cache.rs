//! Memoization of successful rate lookups.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::currency::{RateCurrency, RateKey};

/// Cache name used when none is configured.
pub const DEFAULT_CACHE_NAME: &str = "exchange-rates";

/// One year of daily rates for a single currency.
const DEFAULT_MAX_ENTRIES: usize = 366;

/// Storage for published rates, keyed by (currency, date).
///
/// Only successful lookups are ever written.
pub trait RateCache: Send + Sync {
    fn name(&self) -> &str;

    fn get(&self, key: &RateKey) -> Option<Decimal>;

    fn put(&self, key: RateKey, rate: Decimal);

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which cache implementation to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheBackend {
    #[default]
    InMemory,
    /// Caching switched off; every lookup goes upstream.
    Disabled,
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => write!(f, "in-memory"),
            Self::Disabled => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown cache backend '{0}', expected 'in-memory' or 'none'")]
pub struct UnknownCacheBackend(pub String);

impl FromStr for CacheBackend {
    type Err = UnknownCacheBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-memory" | "memory" => Ok(Self::InMemory),
            "none" | "disabled" => Ok(Self::Disabled),
            _ => Err(UnknownCacheBackend(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub name: String,
    pub backend: CacheBackend,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CACHE_NAME.to_string(),
            backend: CacheBackend::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// Builds the configured cache backend.
pub fn build_cache(config: &CacheConfig) -> Arc<dyn RateCache> {
    match config.backend {
        CacheBackend::InMemory => Arc::new(InMemoryRateCache::new(
            config.name.clone(),
            config.max_entries,
        )),
        CacheBackend::Disabled => Arc::new(NoopRateCache::new(config.name.clone())),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ─────────────────────────────────────────────────────────────────────────────

/// Bounded `DashMap` cache. When full, entries with the oldest rate date go first.
///
/// Reads go straight to the map. Writes are serialized so the bound holds
/// under concurrent inserts.
pub struct InMemoryRateCache {
    name: String,
    max_entries: usize,
    entries: DashMap<RateKey, Decimal>,
    write_lock: Mutex<()>,
}

impl InMemoryRateCache {
    pub fn new(name: impl Into<String>, max_entries: usize) -> Self {
        Self {
            name: name.into(),
            max_entries: max_entries.max(1),
            entries: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    fn oldest(&self) -> Option<RateKey> {
        self.entries
            .iter()
            .map(|entry| *entry.key())
            .min_by_key(eviction_order)
    }
}

fn eviction_order(key: &RateKey) -> (NaiveDate, RateCurrency) {
    (key.date(), key.currency())
}

impl RateCache for InMemoryRateCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &RateKey) -> Option<Decimal> {
        self.entries.get(key).map(|rate| *rate)
    }

    fn put(&self, key: RateKey, rate: Decimal) {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !self.entries.contains_key(&key) {
            while self.entries.len() >= self.max_entries {
                let Some(oldest) = self.oldest() else { break };
                if eviction_order(&key) < eviction_order(&oldest) {
                    debug!(
                        cache = %self.name,
                        %key,
                        "Rate is older than every cached entry, not caching"
                    );
                    return;
                }
                self.entries.remove(&oldest);
                debug!(cache = %self.name, key = %oldest, "Evicted exchange rate");
            }
        }
        self.entries.insert(key, rate);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Disabled backend
// ─────────────────────────────────────────────────────────────────────────────

/// Stores nothing.
pub struct NoopRateCache {
    name: String,
}

impl NoopRateCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl RateCache for NoopRateCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, _key: &RateKey) -> Option<Decimal> {
        None
    }

    fn put(&self, _key: RateKey, _rate: Decimal) {}

    fn clear(&self) {}

    fn len(&self) -> usize {
        0
    }
}
