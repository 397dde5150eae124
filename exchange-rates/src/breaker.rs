//! Circuit breaker guarding calls to the exchange-rate provider.
//!
//! Three states:
//!
//! - **Closed**: calls pass; outcomes fill a count-based window of the last
//!   `minimum_calls` results. A full window whose failure rate exceeds the
//!   threshold opens the circuit.
//! - **Open**: calls are rejected without reaching the provider until
//!   `wait_duration_in_open` has elapsed.
//! - **HalfOpen**: exactly `permitted_calls_in_half_open` trial calls are
//!   admitted. Once every trial has reported, the circuit closes or reopens.
//!
//! Every transition bumps a generation counter. Outcomes are tagged with the
//! generation they were admitted in and dropped if it no longer matches.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::currency::RateKey;
use crate::error::{RateLookupError, RateLookupResult};
use crate::gateway::RateGateway;

/// Breaker name used when none is configured.
pub const DEFAULT_BREAKER_NAME: &str = "exchange-rate-api";

const DEFAULT_MINIMUM_CALLS: usize = 5;
const DEFAULT_FAILURE_RATE_THRESHOLD: f32 = 50.0;
const DEFAULT_WAIT_DURATION_IN_OPEN: Duration = Duration::from_secs(60);
const DEFAULT_PERMITTED_CALLS_IN_HALF_OPEN: usize = 3;

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Size of the closed-state window; the rate is only evaluated once it is full.
    pub minimum_calls: usize,
    /// Failure percentage that must be exceeded to open the circuit.
    pub failure_rate_threshold: f32,
    pub wait_duration_in_open: Duration,
    pub permitted_calls_in_half_open: usize,
}

impl CircuitBreakerConfig {
    /// A threshold is a finite percentage in `(0, 100]`.
    pub fn is_valid_threshold(threshold: f32) -> bool {
        threshold.is_finite() && threshold > 0.0 && threshold <= 100.0
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            minimum_calls: DEFAULT_MINIMUM_CALLS,
            failure_rate_threshold: DEFAULT_FAILURE_RATE_THRESHOLD,
            wait_duration_in_open: DEFAULT_WAIT_DURATION_IN_OPEN,
            permitted_calls_in_half_open: DEFAULT_PERMITTED_CALLS_IN_HALF_OPEN,
        }
    }
}

/// Point-in-time view of a breaker, for logs and diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct CircuitMetrics {
    pub name: String,
    pub state: CircuitState,
    /// Outcomes currently counted (closed window or completed trials).
    pub buffered_calls: usize,
    pub failed_calls: usize,
    /// Percentage of `buffered_calls` that failed; zero when nothing is buffered.
    pub failure_rate: f32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    /// Closed-state outcomes, `true` for a failure.
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    trials_admitted: usize,
    trials_completed: usize,
    trials_failed: usize,
    generation: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            trials_admitted: 0,
            trials_completed: 0,
            trials_failed: 0,
            generation: 0,
        }
    }

    fn counts(&self) -> (usize, usize) {
        match self.state {
            CircuitState::Closed => (
                self.window.len(),
                self.window.iter().filter(|failed| **failed).count(),
            ),
            CircuitState::HalfOpen => (self.trials_completed, self.trials_failed),
            CircuitState::Open => (0, 0),
        }
    }
}

fn failure_rate(buffered: usize, failed: usize) -> f32 {
    if buffered == 0 {
        0.0
    } else {
        failed as f32 * 100.0 / buffered as f32
    }
}

/// A named circuit breaker.
///
/// Shared behind an `Arc`; all bookkeeping happens under a short-lived mutex
/// that is never held across an `.await`.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        let threshold = config.failure_rate_threshold;
        let failure_rate_threshold = if CircuitBreakerConfig::is_valid_threshold(threshold) {
            threshold
        } else {
            warn!(
                breaker = %name,
                threshold,
                fallback = DEFAULT_FAILURE_RATE_THRESHOLD,
                "Failure rate threshold out of range, using default"
            );
            DEFAULT_FAILURE_RATE_THRESHOLD
        };

        let config = CircuitBreakerConfig {
            minimum_calls: config.minimum_calls.max(1),
            permitted_calls_in_half_open: config.permitted_calls_in_half_open.max(1),
            failure_rate_threshold,
            ..config
        };

        Self {
            name,
            config,
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Lock the state mutex, recovering from poison.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!(breaker = %self.name, "Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.window.clear();
        inner.trials_admitted = 0;
        inner.trials_completed = 0;
        inner.trials_failed = 0;
        inner.opened_at = (to == CircuitState::Open).then(Instant::now);

        info!(
            breaker = %self.name,
            %from,
            %to,
            "Circuit breaker state transition"
        );
    }

    /// Moves an expired Open circuit to HalfOpen.
    fn refresh(&self, inner: &mut Inner) {
        if inner.state != CircuitState::Open {
            return;
        }
        let expired = inner
            .opened_at
            .is_none_or(|opened_at| opened_at.elapsed() >= self.config.wait_duration_in_open);
        if expired {
            self.transition(inner, CircuitState::HalfOpen);
        }
    }

    /// Current state, after applying any pending Open → HalfOpen transition.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        inner.state
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let mut inner = self.lock();
        self.refresh(&mut inner);
        let (buffered_calls, failed_calls) = inner.counts();

        CircuitMetrics {
            name: self.name.clone(),
            state: inner.state,
            buffered_calls,
            failed_calls,
            failure_rate: failure_rate(buffered_calls, failed_calls),
        }
    }

    /// Forces the circuit Closed and clears all recorded history.
    pub fn reset(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            self.transition(&mut inner, CircuitState::Closed);
        } else {
            inner.generation += 1;
            inner.window.clear();
        }
        debug!(breaker = %self.name, "Circuit breaker reset");
    }

    /// Asks for permission to make one call.
    ///
    /// `None` means the call must not be made. A granted permit should be
    /// settled with the call's outcome; dropping it unsettled releases a
    /// half-open trial slot without recording anything.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut inner = self.lock();
        self.refresh(&mut inner);

        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                if inner.trials_admitted < self.config.permitted_calls_in_half_open {
                    inner.trials_admitted += 1;
                    true
                } else {
                    false
                }
            }
        };

        if !admitted {
            debug!(breaker = %self.name, state = %inner.state, "Call not permitted");
            return None;
        }

        Some(Permit {
            breaker: self,
            generation: inner.generation,
            settled: false,
        })
    }

    fn on_outcome(&self, generation: u64, failed: bool) {
        let mut inner = self.lock();

        if inner.generation != generation {
            debug!(breaker = %self.name, failed, "Discarding outcome from an earlier state");
            return;
        }

        match inner.state {
            CircuitState::Closed => {
                inner.window.push_back(failed);
                while inner.window.len() > self.config.minimum_calls {
                    inner.window.pop_front();
                }

                let (buffered, failures) = inner.counts();
                let rate = failure_rate(buffered, failures);
                debug!(
                    breaker = %self.name,
                    failed,
                    buffered,
                    failures,
                    "Recorded call outcome"
                );

                if buffered == self.config.minimum_calls
                    && rate > self.config.failure_rate_threshold
                {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.trials_completed += 1;
                if failed {
                    inner.trials_failed += 1;
                }
                debug!(
                    breaker = %self.name,
                    failed,
                    completed = inner.trials_completed,
                    permitted = self.config.permitted_calls_in_half_open,
                    "Recorded trial outcome"
                );

                if inner.trials_completed >= self.config.permitted_calls_in_half_open {
                    let rate = failure_rate(inner.trials_completed, inner.trials_failed);
                    let next = if rate > self.config.failure_rate_threshold {
                        CircuitState::Open
                    } else {
                        CircuitState::Closed
                    };
                    self.transition(&mut inner, next);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_release(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.trials_admitted = inner.trials_admitted.saturating_sub(1);
        }
    }
}

/// Permission for a single call, tied to the breaker state it was granted in.
#[must_use = "settle the permit with the call outcome"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Permit<'_> {
    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.on_outcome(self.generation, false);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.on_outcome(self.generation, true);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.on_release(self.generation);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Hands out one shared breaker per logical name.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    /// All breakers created by this registry use `config`.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.config.clone())))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| b.clone())
    }

    pub fn metrics(&self) -> Vec<CircuitMetrics> {
        let mut all: Vec<_> = self.breakers.iter().map(|b| b.metrics()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn reset_all(&self) {
        for breaker in self.breakers.iter() {
            breaker.reset();
        }
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway decorator
// ─────────────────────────────────────────────────────────────────────────────

/// Runs every lookup of the wrapped gateway through a circuit breaker.
pub struct CircuitBreakingGateway<G> {
    inner: G,
    breaker: Arc<CircuitBreaker>,
}

impl<G: RateGateway> CircuitBreakingGateway<G> {
    pub fn new(inner: G, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

#[async_trait]
impl<G: RateGateway> RateGateway for CircuitBreakingGateway<G> {
    async fn fetch_rate(&self, key: RateKey) -> RateLookupResult {
        let Some(permit) = self.breaker.try_acquire() else {
            return Err(RateLookupError::CallBlocked(format!(
                "Circuit breaker is open. Exchange rate is not fetched for currency {} on date {}.",
                key.currency(),
                key.date()
            )));
        };

        let result = self.inner.fetch_rate(key).await;
        match &result {
            Ok(_) => permit.record_success(),
            Err(e) if e.counts_as_failure() => permit.record_failure(),
            Err(_) => drop(permit),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::RateCurrency;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FlakyGateway {
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl FlakyGateway {
        fn new(failing: bool) -> Self {
            Self {
                failing: AtomicBool::new(failing),
                calls: AtomicUsize::new(0),
            }
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateGateway for Arc<FlakyGateway> {
        async fn fetch_rate(&self, _key: RateKey) -> RateLookupResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(RateLookupError::Unavailable("down".into()))
            } else {
                Ok(dec!(1.1))
            }
        }
    }

    fn key() -> RateKey {
        RateKey::new(
            RateCurrency::USD,
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
    }

    fn config(minimum_calls: usize, permitted: usize) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            minimum_calls,
            failure_rate_threshold: 50.0,
            wait_duration_in_open: Duration::from_secs(60),
            permitted_calls_in_half_open: permitted,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_window_of_failures() {
        let upstream = Arc::new(FlakyGateway::new(true));
        let breaker = Arc::new(CircuitBreaker::new("rates", config(5, 3)));
        let gateway = CircuitBreakingGateway::new(upstream.clone(), breaker.clone());

        for _ in 0..5 {
            let err = gateway.fetch_rate(key()).await.unwrap_err();
            assert!(matches!(err, RateLookupError::Unavailable(_)));
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = gateway.fetch_rate(key()).await.unwrap_err();
        assert!(matches!(err, RateLookupError::CallBlocked(_)));
        assert_eq!(
            err.to_string(),
            "Circuit breaker is open. Exchange rate is not fetched for currency USD on date 2025-01-01."
        );
        assert_eq!(upstream.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_closed_before_window_fills() {
        let breaker = CircuitBreaker::new("rates", config(5, 3));

        for _ in 0..4 {
            breaker.try_acquire().unwrap().record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.metrics().failed_calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_must_be_exceeded() {
        let breaker = CircuitBreaker::new("rates", config(4, 3));

        // 2 of 4 is exactly 50%.
        for failed in [true, false, true, false] {
            let permit = breaker.try_acquire().unwrap();
            if failed {
                permit.record_failure();
            } else {
                permit.record_success();
            }
        }
        assert_eq!(breaker.state(), CircuitState::Closed);

        // Window slides to [false, true, false, true]: still 50%.
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);

        // [true, false, true, true]
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_wait() {
        let breaker = CircuitBreaker::new("rates", config(1, 3));
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.try_acquire().is_none());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_admits_exactly_permitted_trials() {
        let breaker = CircuitBreaker::new("rates", config(1, 3));
        breaker.try_acquire().unwrap().record_failure();
        tokio::time::advance(Duration::from_secs(60)).await;

        let trials: Vec<_> = (0..3).map(|_| breaker.try_acquire().unwrap()).collect();
        assert!(breaker.try_acquire().is_none());

        for trial in trials {
            trial.record_success();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.metrics().buffered_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trials_reopen() {
        let breaker = CircuitBreaker::new("rates", config(1, 3));
        breaker.try_acquire().unwrap().record_failure();
        tokio::time::advance(Duration::from_secs(60)).await;

        breaker.try_acquire().unwrap().record_failure();
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.try_acquire().unwrap().record_success();

        assert_eq!(breaker.state(), CircuitState::Open);

        // The wait timer restarts on reopen.
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_success_closes() {
        let upstream = Arc::new(FlakyGateway::new(true));
        let breaker = Arc::new(CircuitBreaker::new("rates", config(2, 1)));
        let gateway = CircuitBreakingGateway::new(upstream.clone(), breaker.clone());

        gateway.fetch_rate(key()).await.unwrap_err();
        gateway.fetch_rate(key()).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(60)).await;
        upstream.set_failing(false);

        assert_eq!(gateway.fetch_rate(key()).await.unwrap(), dec!(1.1));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(upstream.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_trial_failure_reopens() {
        let breaker = CircuitBreaker::new("rates", config(1, 1));
        breaker.try_acquire().unwrap().record_failure();
        tokio::time::advance(Duration::from_secs(60)).await;

        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_outcome_is_discarded() {
        let breaker = CircuitBreaker::new("rates", config(1, 1));

        let slow = breaker.try_acquire().unwrap();
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        // Admitted while Closed; must not count as the half-open trial.
        slow.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_trial_frees_its_slot() {
        let breaker = CircuitBreaker::new("rates", config(1, 1));
        breaker.try_acquire().unwrap().record_failure();
        tokio::time::advance(Duration::from_secs(60)).await;

        let trial = breaker.try_acquire().unwrap();
        assert!(breaker.try_acquire().is_none());
        drop(trial);

        assert!(breaker.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_history() {
        let breaker = CircuitBreaker::new("rates", config(2, 1));
        breaker.try_acquire().unwrap().record_failure();
        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        breaker.reset();

        let metrics = breaker.metrics();
        assert_eq!(metrics.state, CircuitState::Closed);
        assert_eq!(metrics.buffered_calls, 0);
        assert_eq!(metrics.failure_rate, 0.0);
    }

    #[test]
    fn test_out_of_range_threshold_falls_back_to_default() {
        for threshold in [-1.0, 0.0, 150.0, f32::NAN, f32::INFINITY] {
            let breaker = CircuitBreaker::new(
                "rates",
                CircuitBreakerConfig {
                    failure_rate_threshold: threshold,
                    ..config(2, 1)
                },
            );
            assert_eq!(breaker.config().failure_rate_threshold, 50.0);

            // Healthy calls keep it closed, a failing window opens it.
            breaker.try_acquire().unwrap().record_success();
            breaker.try_acquire().unwrap().record_success();
            assert_eq!(breaker.state(), CircuitState::Closed);
            breaker.try_acquire().unwrap().record_failure();
            breaker.try_acquire().unwrap().record_failure();
            assert_eq!(breaker.state(), CircuitState::Open);
        }

        assert!(CircuitBreakerConfig::is_valid_threshold(100.0));
        assert!(!CircuitBreakerConfig::is_valid_threshold(100.5));
    }

    #[test]
    fn test_metrics_report_failure_rate() {
        let breaker = CircuitBreaker::new("rates", config(4, 1));
        breaker.try_acquire().unwrap().record_failure();
        breaker.try_acquire().unwrap().record_success();

        let metrics = breaker.metrics();
        assert_eq!(metrics.name, "rates");
        assert_eq!(metrics.buffered_calls, 2);
        assert_eq!(metrics.failed_calls, 1);
        assert_eq!(metrics.failure_rate, 50.0);
    }

    #[test]
    fn test_registry_shares_breaker_per_name() {
        let registry = CircuitBreakerRegistry::new(config(1, 1));
        let a = registry.get_or_create("rates");
        let b = registry.get_or_create("rates");
        let other = registry.get_or_create("other");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));

        a.try_acquire().unwrap().record_failure();
        assert_eq!(b.state(), CircuitState::Open);

        registry.reset_all();
        assert_eq!(registry.get("rates").unwrap().state(), CircuitState::Closed);
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.metrics().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_inner_result_is_not_recorded() {
        struct Blocked;

        #[async_trait]
        impl RateGateway for Blocked {
            async fn fetch_rate(&self, _key: RateKey) -> RateLookupResult {
                Err(RateLookupError::CallBlocked("nested".into()))
            }
        }

        let breaker = Arc::new(CircuitBreaker::new("rates", config(1, 1)));
        let gateway = CircuitBreakingGateway::new(Blocked, breaker.clone());

        gateway.fetch_rate(key()).await.unwrap_err();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.metrics().buffered_calls, 0);
    }

    struct GatedGateway {
        calls: AtomicUsize,
        gate: tokio::sync::Semaphore,
    }

    #[async_trait]
    impl RateGateway for Arc<GatedGateway> {
        async fn fetch_rate(&self, _key: RateKey) -> RateLookupResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _open = self.gate.acquire().await.unwrap();
            Ok(dec!(1.1))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_half_open_admits_only_permitted_trials() {
        let upstream = Arc::new(GatedGateway {
            calls: AtomicUsize::new(0),
            gate: tokio::sync::Semaphore::new(0),
        });
        let breaker = Arc::new(CircuitBreaker::new(
            "rates",
            CircuitBreakerConfig {
                wait_duration_in_open: Duration::ZERO,
                ..config(1, 3)
            },
        ));
        let gateway = Arc::new(CircuitBreakingGateway::new(upstream.clone(), breaker.clone()));

        breaker.try_acquire().unwrap().record_failure();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        let mut calls = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let gateway = gateway.clone();
            calls.spawn(async move { gateway.fetch_rate(key()).await });
        }

        // Admitted trials are parked on the gate, so the first seven to finish
        // are the rejected ones.
        for _ in 0..7 {
            let result = calls.join_next().await.unwrap().unwrap();
            assert!(matches!(result, Err(RateLookupError::CallBlocked(_))));
        }
        assert_eq!(breaker.metrics().state, CircuitState::HalfOpen);

        upstream.gate.add_permits(3);
        while let Some(result) = calls.join_next().await {
            assert_eq!(result.unwrap().unwrap(), dec!(1.1));
        }

        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
