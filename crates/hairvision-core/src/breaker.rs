//! Circuit breaker for the image-generation API.
//!
//! # States
//! - Closed: calls pass through
//! - Open: calls are skipped until `open_until`
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures within the trailing window reach the threshold
//! Open → Closed: open_until has passed (checked lazily), or reset()
//! ```
//!
//! Failures are kept as timestamps in a sliding window, so old failures expire
//! on their own. Failures that tripped the breaker stay in the window after the
//! cool-down; one more failure before they expire trips it again immediately.
//!
//! Every operation has an `*_at` form taking the current time explicitly. The
//! plain forms use [`Utc::now`].

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Defaults
// ============================================================================

/// Failures within the window that open the breaker.
pub const DEFAULT_FAILURE_THRESHOLD: usize = 5;

/// Trailing window over which failures are counted.
pub const DEFAULT_FAILURE_WINDOW: Duration = Duration::from_secs(10 * 60);

/// How long the breaker stays open once tripped.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Circuit breaker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Failures within `window` that open the breaker.
    pub failure_threshold: usize,
    /// Trailing window for counting failures.
    pub window: Duration,
    /// Time the breaker stays open after tripping.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            window: DEFAULT_FAILURE_WINDOW,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the failure threshold (clamped to at least 1).
    #[must_use]
    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the failure window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the cool-down.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Breaker state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are short-circuited.
    Open,
}

/// Read-only snapshot of the breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerStatus {
    /// Current state.
    pub state: CircuitState,
    /// Convenience flag, `state == Open`.
    pub is_open: bool,
    /// Failures inside the trailing window.
    pub failure_count: usize,
    /// Failures that open the breaker.
    pub threshold: usize,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Cool-down length in seconds.
    pub cooldown_secs: u64,
    /// When the breaker closes again, if open.
    pub open_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct BreakerState {
    failures: VecDeque<DateTime<Utc>>,
    open_until: Option<DateTime<Utc>>,
}

impl BreakerState {
    fn prune(&mut self, now: DateTime<Utc>, window: TimeDelta) {
        let cutoff = now - window;
        while self.failures.front().is_some_and(|t| *t <= cutoff) {
            self.failures.pop_front();
        }
    }

    fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.open_until.is_some_and(|until| now < until)
    }
}

/// A failure-counting circuit breaker.
///
/// One instance guards one external dependency. It is shared between request
/// handlers behind an `Arc`; all state lives behind a single mutex so that
/// appending a failure and evaluating the threshold happen atomically.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    window: TimeDelta,
    cooldown: TimeDelta,
    state: Mutex<BreakerState>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    /// Create a closed breaker.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let config = config.with_failure_threshold(config.failure_threshold);
        Self {
            window: to_delta(config.window),
            cooldown: to_delta(config.cooldown),
            config,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// The breaker's configuration.
    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether calls should be short-circuited right now.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.is_open_at(Utc::now())
    }

    /// Check whether calls should be short-circuited at `now`.
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        if state.is_open(now) {
            return true;
        }
        if state.open_until.take().is_some() {
            tracing::info!("Circuit breaker closed after cool-down");
        }
        false
    }

    /// Record a failed call.
    pub fn record_failure(&self) -> CircuitState {
        self.record_failure_at(Utc::now())
    }

    /// Record a failed call at `now`, opening the breaker if the threshold is
    /// reached.
    pub fn record_failure_at(&self, now: DateTime<Utc>) -> CircuitState {
        let mut state = self.lock();
        state.prune(now, self.window);
        state.failures.push_back(now);

        if state.is_open(now) {
            return CircuitState::Open;
        }

        if state.failures.len() >= self.config.failure_threshold {
            let until = now + self.cooldown;
            state.open_until = Some(until);
            tracing::warn!(
                failure_count = state.failures.len(),
                threshold = self.config.failure_threshold,
                open_until = %until,
                "Circuit breaker opened"
            );
            return CircuitState::Open;
        }

        tracing::debug!(
            failure_count = state.failures.len(),
            threshold = self.config.failure_threshold,
            "Circuit breaker recorded failure"
        );
        CircuitState::Closed
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        self.record_success_at(Utc::now());
    }

    /// Record a successful call at `now`. Only stale failures are dropped.
    pub fn record_success_at(&self, now: DateTime<Utc>) {
        self.lock().prune(now, self.window);
    }

    /// Time until the breaker closes, if it is open.
    #[must_use]
    pub fn retry_after_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        let state = self.lock();
        state
            .open_until
            .filter(|until| now < *until)
            .and_then(|until| (until - now).to_std().ok())
    }

    /// Snapshot the breaker.
    #[must_use]
    pub fn status(&self) -> CircuitBreakerStatus {
        self.status_at(Utc::now())
    }

    /// Snapshot the breaker at `now`.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> CircuitBreakerStatus {
        let mut state = self.lock();
        state.prune(now, self.window);
        if !state.is_open(now) {
            state.open_until = None;
        }

        let is_open = state.open_until.is_some();
        CircuitBreakerStatus {
            state: if is_open {
                CircuitState::Open
            } else {
                CircuitState::Closed
            },
            is_open,
            failure_count: state.failures.len(),
            threshold: self.config.failure_threshold,
            window_secs: self.config.window.as_secs(),
            cooldown_secs: self.config.cooldown.as_secs(),
            open_until: state.open_until,
        }
    }

    /// Close the breaker and forget all failures.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.failures.clear();
        state.open_until = None;
        tracing::info!("Circuit breaker reset");
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::days(365))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> TimeDelta {
        TimeDelta::seconds(n)
    }

    #[test]
    fn starts_closed() {
        let breaker = CircuitBreaker::default();
        let status = breaker.status_at(t0());
        assert!(!breaker.is_open_at(t0()));
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.failure_count, 0);
        assert_eq!(status.threshold, 5);
        assert_eq!(status.window_secs, 600);
        assert_eq!(status.cooldown_secs, 60);
        assert!(status.open_until.is_none());
    }

    #[test]
    fn opens_on_fifth_failure_within_window() {
        let breaker = CircuitBreaker::default();

        for i in 0..4 {
            let state = breaker.record_failure_at(t0() + secs(i * 60));
            assert_eq!(state, CircuitState::Closed);
        }
        assert!(!breaker.is_open_at(t0() + secs(240)));

        let state = breaker.record_failure_at(t0() + secs(300));
        assert_eq!(state, CircuitState::Open);
        assert!(breaker.is_open_at(t0() + secs(301)));

        let status = breaker.status_at(t0() + secs(301));
        assert_eq!(status.failure_count, 5);
        assert_eq!(status.open_until, Some(t0() + secs(360)));
    }

    #[test]
    fn closes_after_cooldown_without_reset() {
        let breaker = CircuitBreaker::default();
        for _ in 0..5 {
            breaker.record_failure_at(t0());
        }
        assert!(breaker.is_open_at(t0() + secs(59)));
        assert!(!breaker.is_open_at(t0() + secs(60)));
        assert!(!breaker.status_at(t0() + secs(61)).is_open);
    }

    #[test]
    fn failures_outside_window_do_not_count() {
        let breaker = CircuitBreaker::default();
        for i in 0..4 {
            breaker.record_failure_at(t0() + secs(i));
        }

        // Ten minutes after the first failures they have all expired.
        let later = t0() + secs(10 * 60 + 4);
        assert_eq!(breaker.record_failure_at(later), CircuitState::Closed);
        assert_eq!(breaker.status_at(later).failure_count, 1);
    }

    #[test]
    fn failure_after_cooldown_retrips_while_window_is_full() {
        let breaker = CircuitBreaker::default();
        for _ in 0..5 {
            breaker.record_failure_at(t0());
        }
        assert!(!breaker.is_open_at(t0() + secs(61)));

        assert_eq!(
            breaker.record_failure_at(t0() + secs(62)),
            CircuitState::Open
        );
        assert!(breaker.is_open_at(t0() + secs(63)));
    }

    #[test]
    fn failures_while_open_do_not_extend_cooldown() {
        let breaker = CircuitBreaker::default();
        for _ in 0..5 {
            breaker.record_failure_at(t0());
        }
        breaker.record_failure_at(t0() + secs(30));
        assert_eq!(
            breaker.status_at(t0() + secs(31)).open_until,
            Some(t0() + secs(60))
        );
    }

    #[test]
    fn success_keeps_fresh_failures() {
        let breaker = CircuitBreaker::default();
        for _ in 0..3 {
            breaker.record_failure_at(t0());
        }
        breaker.record_success_at(t0() + secs(1));
        assert_eq!(breaker.status_at(t0() + secs(1)).failure_count, 3);

        breaker.record_success_at(t0() + secs(601));
        assert_eq!(breaker.status_at(t0() + secs(601)).failure_count, 0);
    }

    #[test]
    fn reset_always_closes() {
        let breaker = CircuitBreaker::default();
        for _ in 0..7 {
            breaker.record_failure_at(t0());
        }
        assert!(breaker.is_open_at(t0()));

        breaker.reset();
        let status = breaker.status_at(t0());
        assert!(!status.is_open);
        assert_eq!(status.failure_count, 0);
        assert!(status.open_until.is_none());

        // Reset on a closed breaker is harmless.
        breaker.reset();
        assert_eq!(breaker.status_at(t0()).failure_count, 0);
    }

    #[test]
    fn retry_after_reports_remaining_cooldown() {
        let breaker = CircuitBreaker::default();
        assert!(breaker.retry_after_at(t0()).is_none());

        for _ in 0..5 {
            breaker.record_failure_at(t0());
        }
        assert_eq!(
            breaker.retry_after_at(t0() + secs(20)),
            Some(Duration::from_secs(40))
        );
        assert!(breaker.retry_after_at(t0() + secs(60)).is_none());
    }

    #[test]
    fn custom_config() {
        let config = CircuitBreakerConfig::default()
            .with_failure_threshold(2)
            .with_window(Duration::from_secs(30))
            .with_cooldown(Duration::from_secs(5));
        let breaker = CircuitBreaker::new(config);

        breaker.record_failure_at(t0());
        assert_eq!(
            breaker.record_failure_at(t0() + secs(29)),
            CircuitState::Open
        );
        assert!(!breaker.is_open_at(t0() + secs(34)));
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 0,
            ..CircuitBreakerConfig::default()
        });
        assert_eq!(breaker.config().failure_threshold, 1);
        assert!(!breaker.is_open_at(t0()));
    }

    #[test]
    fn concurrent_failures_are_all_counted() {
        let breaker = std::sync::Arc::new(CircuitBreaker::new(
            CircuitBreakerConfig::default().with_failure_threshold(1000),
        ));
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let breaker = breaker.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        breaker.record_failure_at(now);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(breaker.status_at(now).failure_count, 400);
    }
}
