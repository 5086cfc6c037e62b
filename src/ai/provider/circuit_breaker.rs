//! Per-provider circuit breaker
//!
//! A provider that keeps failing across requests is skipped by every chain
//! that contains it until its recovery window elapses.
//!
//! ```text
//! Closed --[failure_threshold consecutive failures]--> Open
//! Open --[recovery window elapsed]--> HalfOpen
//! HalfOpen --[success_threshold successes]--> Closed
//! HalfOpen --[any failure]--> Open
//! HalfOpen --[trials unresolved for a recovery window]--> HalfOpen (trials re-armed)
//! ```
//!
//! A trial request dropped mid-flight never reports back, so trial
//! slots are re-armed after a recovery window without an outcome.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::constants::circuit_breaker as cb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Successes in half-open before closing
    pub success_threshold: u32,
    /// Time spent open before trying again
    pub recovery_timeout: Duration,
    /// Trial requests allowed while half-open
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: cb::FAILURE_THRESHOLD,
            success_threshold: cb::SUCCESS_THRESHOLD,
            recovery_timeout: Duration::from_secs(cb::RECOVERY_TIMEOUT_SECS),
            half_open_max_requests: cb::HALF_OPEN_MAX_REQUESTS,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    trials: u32,
    opened_at: Option<Instant>,
    /// When the current set of trial slots was handed out
    trials_since: Option<Instant>,
    rejected: u64,
}

impl Inner {
    fn open(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trials_since = None;
        self.trials = 0;
        self.successes = 0;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.failures = 0;
        self.successes = 0;
        self.trials = 0;
        self.opened_at = None;
        self.trials_since = None;
    }

    fn half_open(&mut self) {
        self.state = CircuitState::HalfOpen;
        self.trials = 0;
        self.successes = 0;
        self.trials_since = Some(Instant::now());
    }
}

/// Thread-safe breaker; all counters live behind one lock so transitions are atomic
pub struct CircuitBreaker {
    provider: String,
    config: CircuitBreakerConfig,
    inner: RwLock<Inner>,
}

impl CircuitBreaker {
    pub fn new(provider: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            provider: provider.into(),
            config,
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                trials: 0,
                opened_at: None,
                trials_since: None,
                rejected: 0,
            }),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.refresh();
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .state
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Whether a request may be sent now; counts half-open trials
    pub fn allow_request(&self) -> bool {
        self.refresh();
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen if inner.trials < self.config.half_open_max_requests => {
                inner.trials += 1;
                tracing::debug!(
                    provider = %self.provider,
                    trial = inner.trials,
                    "Circuit half-open, sending trial request"
                );
                true
            }
            _ => {
                inner.rejected += 1;
                tracing::debug!(provider = %self.provider, "Circuit rejected request");
                false
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.failures = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.successes += 1;
            if inner.successes >= self.config.success_threshold {
                inner.close();
                tracing::info!(provider = %self.provider, "Circuit closed, provider recovered");
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.successes = 0;
        match inner.state {
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.config.failure_threshold {
                    inner.open();
                    tracing::warn!(
                        provider = %self.provider,
                        failures = inner.failures,
                        recovery = ?self.config.recovery_timeout,
                        "Circuit opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.open();
                tracing::warn!(provider = %self.provider, "Trial request failed, circuit re-opened");
            }
            CircuitState::Open => {}
        }
    }

    /// Give back a half-open trial slot whose outcome says nothing about health
    pub fn release_trial(&self) {
        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if inner.state == CircuitState::HalfOpen {
            inner.trials = inner.trials.saturating_sub(1);
        }
    }

    pub fn reset(&self) {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .close();
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        self.refresh();
        let inner = self
            .inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        CircuitBreakerStats {
            provider: self.provider.clone(),
            state: inner.state,
            consecutive_failures: inner.failures,
            rejected: inner.rejected,
            open_for_secs: inner.opened_at.map(|t| t.elapsed().as_secs()),
        }
    }

    /// Open -> HalfOpen once the recovery window has elapsed, and re-arm
    /// half-open trials that never reported back
    fn refresh(&self) {
        if !self.transition_due(&self.read_inner()) {
            return;
        }

        let mut inner = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !self.transition_due(&inner) {
            return;
        }
        if inner.state == CircuitState::Open {
            tracing::info!(provider = %self.provider, "Circuit half-open");
        } else {
            tracing::warn!(
                provider = %self.provider,
                trials = inner.trials,
                "Half-open trials never resolved, re-arming"
            );
        }
        inner.half_open();
    }

    fn transition_due(&self, inner: &Inner) -> bool {
        let elapsed = |t: Option<Instant>| t.is_some_and(|t| t.elapsed() >= self.config.recovery_timeout);
        match inner.state {
            CircuitState::Open => elapsed(inner.opened_at),
            CircuitState::HalfOpen => {
                inner.trials >= self.config.half_open_max_requests
                    && elapsed(inner.trials_since)
            }
            CircuitState::Closed => false,
        }
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Breaker snapshot reported by the provider status endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerStats {
    pub provider: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub rejected: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_for_secs: Option<u64>,
}
