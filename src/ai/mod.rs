//! AI Integration Layer
//!
//! Text and image backends behind fallback chains, plus the prompts and
//! output validation they rely on.

pub mod image;
pub mod prompt;
pub mod provider;
pub mod text;
pub mod timeout;
pub mod validation;

use std::time::Duration;

pub use image::{
    GeminiImagenProvider, ImageBatch, ImageRequest, PollinationsProvider, PredictionRetry,
    ReplicateFluxProvider,
    ReplicateSdxlProvider,
};
pub use prompt::{AspectRatio, PromptBuilder, PromptSection};
pub use provider::{
    ChainConfig, ChainStats, CircuitBreaker, CircuitBreakerConfig, CircuitState, Provider,
    ProviderChain, ProviderChainBuilder, ProviderStatus, SharedProvider,
};
pub use text::{OpenAiCompatProvider, TextCompletion, TextRequest, TokenUsage};
pub use timeout::{TimeoutConfig, with_timeout};
pub use validation::{JsonRepairer, extract_json, parse_validated};

use crate::types::{EchoError, Result};

/// Shared HTTP client for every provider
///
/// Connection pooling is per client, so one instance is built per chain.
pub fn http_client(timeout: Duration, connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| EchoError::Config(format!("Failed to create HTTP client: {}", e)))
}
