//! Fallback Provider Chain
//!
//! Providers are tried in insertion order. Each one gets a bounded number of
//! attempts with exponential backoff; failures that retrying cannot fix
//! (missing key, rejected credentials, unavailable model, rejected request)
//! move on to the next provider at once. When every provider is exhausted
//! the caller gets one [`ProviderFailure`] per provider.
//!
//! ## Strategy
//!
//! 1. Skip providers without credentials (recorded as CONFIG, 0 attempts)
//! 2. Skip providers whose circuit is open
//! 3. Attempt, then validate the output with the caller's mapper
//! 4. On failure, classify it; only provider-health failures count against the circuit
//! 5. Retry after `min(base × factor^attempt, max)` plus jitter, or honour `retry_after`
//! 6. Continue until success or all providers exhausted

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::{Provider, SharedProvider};
use crate::config::RetryConfig;
use crate::constants::chain as chain_constants;
use crate::types::{EchoError, ErrorCategory, ProviderError, ProviderFailure, Result};

/// Provider with its attempt budget
pub struct ChainedProvider<Req: Sync, Out: Send> {
    pub provider: SharedProvider<Req, Out>,
    pub max_attempts: u8,
}

impl<Req: Sync, Out: Send> Clone for ChainedProvider<Req, Out> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Maximum attempts across all providers in one execution
    pub max_total_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f32,
    /// Add up to 25% random jitter to backoff delays
    pub jitter: bool,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_total_attempts: chain_constants::MAX_TOTAL_ATTEMPTS,
            base_delay: Duration::from_millis(chain_constants::BASE_DELAY_MS),
            max_delay: Duration::from_millis(chain_constants::MAX_DELAY_MS),
            backoff_factor: chain_constants::BACKOFF_FACTOR,
            jitter: true,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn from_retry(retry: &RetryConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(retry.base_delay_ms),
            max_delay: Duration::from_millis(retry.max_delay_ms),
            backoff_factor: retry.backoff_factor,
            jitter: retry.jitter,
            ..Self::default()
        }
    }
}

/// One attempt against one provider
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainAttempt {
    pub provider: String,
    /// 1-based attempt number within this provider
    pub attempt: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub duration_ms: u64,
}

/// Execution statistics for one chain run
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    pub total_attempts: usize,
    /// Provider that served the result
    pub successful_provider: Option<String>,
    pub attempts: Vec<ChainAttempt>,
    pub total_duration_ms: u64,
    /// Providers skipped without an attempt (unconfigured or circuit open)
    pub providers_skipped: usize,
}

impl ChainStats {
    pub fn served_by(&self) -> &str {
        self.successful_provider.as_deref().unwrap_or_default()
    }
}

/// Provider entry as reported by the status endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub model: String,
    pub configured: bool,
    pub max_attempts: u8,
    pub circuit: CircuitState,
    pub consecutive_failures: u32,
    /// Requests turned away by the circuit since start
    pub rejected: u64,
}

/// Ordered fallback chain
///
/// Circuit breakers live in a shared `DashMap` so clones of a chain see the
/// same provider health.
pub struct ProviderChain<Req: Sync, Out: Send> {
    providers: Vec<ChainedProvider<Req, Out>>,
    config: ChainConfig,
    breakers: Arc<DashMap<String, CircuitBreaker>>,
}

impl<Req: Sync, Out: Send> Clone for ProviderChain<Req, Out> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
            config: self.config.clone(),
            breakers: Arc::clone(&self.breakers),
        }
    }
}

impl<Req: Sync, Out: Send> ProviderChain<Req, Out> {
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run the chain and return the first successful output
    pub async fn execute(&self, operation: &str, request: &Req) -> Result<(Out, ChainStats)> {
        self.execute_map(operation, request, |out, _| Ok(out)).await
    }

    /// Run the chain, converting each output with `map`
    ///
    /// A mapping failure counts as a failure of the provider that produced the
    /// output, so malformed output is retried or falls through to the next provider.
    #[instrument(skip_all, fields(operation = %operation, providers = self.providers.len()))]
    pub async fn execute_map<R, F>(
        &self,
        operation: &str,
        request: &Req,
        map: F,
    ) -> Result<(R, ChainStats)>
    where
        F: Fn(Out, &str) -> std::result::Result<R, ProviderError>,
    {
        if self.providers.is_empty() {
            return Err(EchoError::Config(format!(
                "No providers configured for {}",
                operation
            )));
        }

        let started = Instant::now();
        let mut stats = ChainStats::default();
        let mut failures: Vec<ProviderFailure> = Vec::with_capacity(self.providers.len());

        for entry in &self.providers {
            let provider = &entry.provider;
            let name = provider.name().to_string();

            if !provider.is_configured() {
                debug!(provider = %name, "Skipping provider (not configured)");
                stats.providers_skipped += 1;
                failures.push(skipped(&name, ErrorCategory::Config, "not configured"));
                continue;
            }

            if self.with_breaker(&name, |cb| cb.is_open()) {
                debug!(provider = %name, "Skipping provider (circuit open)");
                stats.providers_skipped += 1;
                failures.push(skipped(&name, ErrorCategory::Unavailable, "circuit open"));
                continue;
            }

            let mut attempts = 0usize;
            let mut last_error: Option<ProviderError> = None;

            for attempt in 0..entry.max_attempts {
                if stats.total_attempts >= self.config.max_total_attempts {
                    debug!(provider = %name, "Total attempt budget exhausted");
                    break;
                }
                if !self.with_breaker(&name, |cb| cb.allow_request()) {
                    break;
                }

                attempts += 1;
                stats.total_attempts += 1;
                let attempt_started = Instant::now();

                debug!(
                    provider = %name,
                    model = provider.model(),
                    attempt = attempt + 1,
                    max_attempts = entry.max_attempts,
                    "Chain attempt"
                );

                let result = provider
                    .generate(request)
                    .await
                    .and_then(|out| map(out, &name));
                let duration_ms = attempt_started.elapsed().as_millis() as u64;

                match result {
                    Ok(value) => {
                        self.with_breaker(&name, |cb| cb.record_success());
                        stats.attempts.push(ChainAttempt {
                            provider: name.clone(),
                            attempt: attempts,
                            success: true,
                            category: None,
                            duration_ms,
                        });
                        stats.total_duration_ms = started.elapsed().as_millis() as u64;
                        info!(
                            provider = %name,
                            attempts = stats.total_attempts,
                            duration_ms = stats.total_duration_ms,
                            "Chain succeeded"
                        );
                        stats.successful_provider = Some(name);
                        return Ok((value, stats));
                    }
                    Err(err) => {
                        let err = err.attributed_to(&name);
                        let trips = err.category.trips_circuit();
                        let circuit_open = self.with_breaker(&name, |cb| {
                            if trips {
                                cb.record_failure();
                            } else {
                                cb.release_trial();
                            }
                            cb.is_open()
                        });

                        stats.attempts.push(ChainAttempt {
                            provider: name.clone(),
                            attempt: attempts,
                            success: false,
                            category: Some(err.category),
                            duration_ms,
                        });
                        warn!(
                            provider = %name,
                            attempt = attempts,
                            category = %err.category,
                            error = %err.message,
                            "Provider attempt failed"
                        );

                        let category = err.category;
                        let retry_after = err.retry_after;
                        last_error = Some(err);

                        if category.skips_provider() {
                            info!(provider = %name, %category, "Moving to next provider");
                            break;
                        }
                        if circuit_open {
                            info!(provider = %name, "Circuit opened, moving to next provider");
                            break;
                        }

                        if attempt + 1 < entry.max_attempts {
                            let delay = self.retry_delay(category, retry_after, attempt);
                            debug!(delay_ms = delay.as_millis() as u64, "Retrying after backoff");
                            if !delay.is_zero() {
                                sleep(delay).await;
                            }
                        }
                    }
                }
            }

            failures.push(match last_error {
                Some(err) => ProviderFailure::from_error(err, attempts),
                None => skipped(&name, ErrorCategory::Unavailable, "no attempt made"),
            });
        }

        stats.total_duration_ms = started.elapsed().as_millis() as u64;
        error!(
            providers = failures.len(),
            attempts = stats.total_attempts,
            "All providers failed"
        );

        Err(EchoError::AllProvidersFailed {
            operation: operation.to_string(),
            failures,
        })
    }

    /// Status of every provider in chain order
    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.providers
            .iter()
            .map(|entry| {
                let name = entry.provider.name();
                let breaker = self.breakers.get(name).map(|cb| cb.stats());
                ProviderStatus {
                    name: name.to_string(),
                    model: entry.provider.model().to_string(),
                    configured: entry.provider.is_configured(),
                    max_attempts: entry.max_attempts,
                    circuit: breaker.as_ref().map_or(CircuitState::Closed, |b| b.state),
                    consecutive_failures: breaker.as_ref().map_or(0, |b| b.consecutive_failures),
                    rejected: breaker.map_or(0, |b| b.rejected),
                }
            })
            .collect()
    }

    pub fn circuit_state(&self, provider: &str) -> Option<CircuitState> {
        self.breakers.get(provider).map(|cb| cb.state())
    }

    pub fn reset_circuit_breakers(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    /// Run `f` against the provider's breaker, creating it on first use
    ///
    /// The map guard is released before returning; never hold it across an await.
    fn with_breaker<T>(&self, provider: &str, f: impl FnOnce(&CircuitBreaker) -> T) -> T {
        let breaker = self
            .breakers
            .entry(provider.to_string())
            .or_insert_with(|| CircuitBreaker::new(provider, self.config.circuit_breaker.clone()));
        f(breaker.value())
    }

    fn retry_delay(
        &self,
        category: ErrorCategory,
        retry_after: Option<Duration>,
        attempt: u8,
    ) -> Duration {
        if category == ErrorCategory::RateLimit
            && let Some(wait) = retry_after
        {
            return wait.min(self.config.max_delay);
        }

        let delay = backoff_delay(
            self.config.base_delay,
            self.config.backoff_factor,
            u32::from(attempt),
            self.config.max_delay,
        );
        if self.config.jitter {
            delay + random_jitter(delay)
        } else {
            delay
        }
    }
}

fn skipped(provider: &str, category: ErrorCategory, message: &str) -> ProviderFailure {
    ProviderFailure {
        provider: provider.to_string(),
        category,
        message: message.to_string(),
        attempts: 0,
    }
}

/// `min(base × factor^attempt, max)`
pub fn backoff_delay(base: Duration, factor: f32, attempt: u32, max: Duration) -> Duration {
    let exponent = attempt.min(64) as i32;
    let millis = base.as_millis() as f64 * f64::from(factor).powi(exponent);
    if !millis.is_finite() || millis >= max.as_millis() as f64 {
        return max;
    }
    Duration::from_millis(millis as u64)
}

/// Up to 25% of the delay
fn random_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = (delay.as_millis() as f64 * chain_constants::JITTER_RATIO) as u64;
    if max_jitter_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_jitter_ms))
}

/// Builder for provider chains
pub struct ProviderChainBuilder<Req: Sync, Out: Send> {
    providers: Vec<ChainedProvider<Req, Out>>,
    config: ChainConfig,
}

impl<Req: Sync, Out: Send> ProviderChainBuilder<Req, Out> {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            config: ChainConfig::default(),
        }
    }

    /// Add a provider with the default attempt budget
    pub fn add(self, provider: impl Provider<Req, Out> + 'static) -> Self {
        self.add_with_attempts(provider, chain_constants::TEXT_MAX_ATTEMPTS)
    }

    pub fn add_with_attempts(
        self,
        provider: impl Provider<Req, Out> + 'static,
        max_attempts: u8,
    ) -> Self {
        self.add_shared(Arc::new(provider), max_attempts)
    }

    pub fn add_shared(mut self, provider: SharedProvider<Req, Out>, max_attempts: u8) -> Self {
        self.providers.push(ChainedProvider {
            provider,
            max_attempts: max_attempts.max(1),
        });
        self
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ProviderChain<Req, Out> {
        ProviderChain {
            providers: self.providers,
            config: self.config,
            breakers: Arc::new(DashMap::new()),
        }
    }
}

impl<Req: Sync, Out: Send> Default for ProviderChainBuilder<Req, Out> {
    fn default() -> Self {
        Self::new()
    }
}
