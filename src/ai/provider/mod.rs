//! Provider Abstraction
//!
//! A [`Provider`] turns one request type into one output type over some
//! external API. Text and image backends implement it with different
//! request/output pairs and share the same fallback machinery.
//!
//! ## Modules
//!
//! - `chain`: Ordered fallback chain with per-provider retries and backoff
//! - `circuit_breaker`: Skips providers that keep failing across requests

mod chain;
mod circuit_breaker;

pub use chain::{
    ChainAttempt, ChainConfig, ChainStats, ChainedProvider, ProviderChain, ProviderChainBuilder,
    ProviderStatus, backoff_delay,
};
pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};

pub use crate::types::{ErrorCategory, ErrorClassifier, ProviderError};

use std::sync::Arc;

use async_trait::async_trait;

/// A generation backend
#[async_trait]
pub trait Provider<Req: Sync, Out: Send>: Send + Sync {
    /// Provider name, used for logs, failures and `usedModel`
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;

    /// Whether credentials are present; unconfigured providers are skipped
    fn is_configured(&self) -> bool {
        true
    }

    async fn generate(&self, request: &Req) -> Result<Out, ProviderError>;
}

/// Shared provider handle
pub type SharedProvider<Req, Out> = Arc<dyn Provider<Req, Out>>;
