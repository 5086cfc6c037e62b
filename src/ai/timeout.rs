//! Timeouts for provider calls
//!
//! ```ignore
//! use crate::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::default();
//! let partner = with_timeout(config.text_request, studio.generate_partner(&answers), "partner").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::config::Config;
use crate::constants::network;
use crate::types::{EchoError, Result};

/// Per-request timeouts handed to the HTTP clients
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Chat completion request (default: 2 minutes)
    pub text_request: Duration,
    /// Image generation request including Replicate polling (default: 2 minutes)
    pub image_request: Duration,
    /// TCP connect (default: 30 seconds)
    pub connection: Duration,
    /// Whole chain run across every fallback (default: 10 minutes)
    pub operation: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            text_request: Duration::from_secs(network::TEXT_TIMEOUT_SECS),
            image_request: Duration::from_secs(network::IMAGE_TIMEOUT_SECS),
            connection: Duration::from_secs(network::CONNECTION_TIMEOUT_SECS),
            operation: Duration::from_secs(network::OPERATION_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            text_request: config.text.timeout(),
            image_request: config.image.timeout(),
            ..Self::default()
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns [`EchoError::Timeout`] if the operation doesn't complete in time.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(EchoError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.image.timeout_secs = 7;
        let timeouts = TimeoutConfig::from_config(&config);
        assert_eq!(timeouts.image_request, Duration::from_secs(7));
        assert_eq!(timeouts.text_request, Duration::from_secs(120));
        assert_eq!(timeouts.connection, Duration::from_secs(30));
        assert_eq!(timeouts.operation, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, EchoError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, EchoError>(42)
            },
            "slow operation",
        )
        .await;
        assert!(matches!(result.unwrap_err(), EchoError::Timeout { .. }));
    }
}
