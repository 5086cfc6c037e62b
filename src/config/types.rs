//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/echo-studio/) and project (.echo-studio/) configuration.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::constants::{chain, image, network, server, text};
use crate::types::{EchoError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Text generation (LLM) settings
    pub text: TextConfig,

    /// Image generation settings
    pub image: ImageConfig,

    /// Retry and backoff tuning shared by both chains
    pub retry: RetryConfig,

    /// Provider credentials
    pub keys: ApiKeys,
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.text.temperature) {
            return Err(EchoError::Config(format!(
                "text.temperature must be between 0.0 and 2.0, got {}",
                self.text.temperature
            )));
        }

        if self.text.timeout_secs == 0 || self.image.timeout_secs == 0 {
            return Err(EchoError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        if !(1..=image::MAX_COUNT).contains(&self.image.default_count) {
            return Err(EchoError::Config(format!(
                "image.default_count must be between 1 and {}, got {}",
                image::MAX_COUNT,
                self.image.default_count
            )));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(EchoError::Config(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }

        if self.retry.backoff_factor < 1.0 {
            return Err(EchoError::Config(format!(
                "retry.backoff_factor must be at least 1.0, got {}",
                self.retry.backoff_factor
            )));
        }

        let attempts = [
            self.retry.text_max_attempts,
            self.retry.image_max_attempts,
            self.retry.pollinations_max_attempts,
            self.retry.gemini_max_attempts,
        ];
        if attempts.contains(&0) {
            return Err(EchoError::Config(
                "retry attempt counts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Server
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
        }
    }
}

// =============================================================================
// Text Generation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Sampling temperature for partner synthesis
    pub temperature: f32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub deepseek_base_url: String,
    pub openai_base_url: String,
    pub reasoner_max_tokens: usize,
    pub chat_max_tokens: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            temperature: text::PARTNER_TEMPERATURE,
            timeout_secs: network::TEXT_TIMEOUT_SECS,
            deepseek_base_url: text::DEEPSEEK_BASE_URL.to_string(),
            openai_base_url: text::OPENAI_BASE_URL.to_string(),
            reasoner_max_tokens: text::REASONER_MAX_TOKENS,
            chat_max_tokens: text::CHAT_MAX_TOKENS,
        }
    }
}

impl TextConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Image Generation
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Images per request when the caller does not specify
    pub default_count: u8,
    /// Aspect ratio when the caller does not specify
    pub default_aspect_ratio: String,
    pub timeout_secs: u64,
    pub pollinations_base_url: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub replicate_base_url: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            default_count: image::DEFAULT_COUNT,
            default_aspect_ratio: "9:16".to_string(),
            timeout_secs: network::IMAGE_TIMEOUT_SECS,
            pollinations_base_url: image::POLLINATIONS_BASE_URL.to_string(),
            gemini_base_url: image::GEMINI_BASE_URL.to_string(),
            gemini_model: image::GEMINI_MODEL.to_string(),
            replicate_base_url: image::REPLICATE_BASE_URL.to_string(),
        }
    }
}

impl ImageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// =============================================================================
// Retry
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f32,
    /// Add up to 25% random jitter to each delay
    pub jitter: bool,
    pub text_max_attempts: u8,
    pub image_max_attempts: u8,
    pub pollinations_max_attempts: u8,
    pub gemini_max_attempts: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: chain::BASE_DELAY_MS,
            max_delay_ms: chain::MAX_DELAY_MS,
            backoff_factor: chain::BACKOFF_FACTOR,
            jitter: true,
            text_max_attempts: chain::TEXT_MAX_ATTEMPTS,
            image_max_attempts: chain::IMAGE_MAX_ATTEMPTS,
            pollinations_max_attempts: chain::POLLINATIONS_MAX_ATTEMPTS,
            gemini_max_attempts: chain::GEMINI_MAX_ATTEMPTS,
        }
    }
}

// =============================================================================
// API Keys
// =============================================================================

/// Provider credentials
///
/// Keys are never serialized and are redacted in debug output.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    #[serde(skip_serializing)]
    pub deepseek: Option<String>,
    #[serde(skip_serializing)]
    pub openai: Option<String>,
    #[serde(skip_serializing)]
    pub gemini: Option<String>,
    #[serde(skip_serializing)]
    pub replicate: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ApiKeys")
            .field("deepseek", &redact(&self.deepseek))
            .field("openai", &redact(&self.openai))
            .field("gemini", &redact(&self.gemini))
            .field("replicate", &redact(&self.replicate))
            .finish()
    }
}

/// Conventional environment variable per provider
pub const DEEPSEEK_KEY_ENV: &str = "DEEPSEEK_API_KEY";
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const GEMINI_KEY_ENV: &str = "GOOGLE_GEMINI_API_KEY";
pub const REPLICATE_KEY_ENV: &str = "REPLICATE_API_TOKEN";

impl ApiKeys {
    /// Fill missing keys from the conventional provider variables
    pub fn with_env_fallback(mut self) -> Self {
        let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        if self.deepseek.is_none() {
            self.deepseek = from_env(DEEPSEEK_KEY_ENV);
        }
        if self.openai.is_none() {
            self.openai = from_env(OPENAI_KEY_ENV);
        }
        if self.gemini.is_none() {
            self.gemini = from_env(GEMINI_KEY_ENV);
        }
        if self.replicate.is_none() {
            self.replicate = from_env(REPLICATE_KEY_ENV);
        }
        self
    }

    pub fn deepseek_secret(&self) -> Option<SecretString> {
        secret(&self.deepseek)
    }

    pub fn openai_secret(&self) -> Option<SecretString> {
        secret(&self.openai)
    }

    pub fn gemini_secret(&self) -> Option<SecretString> {
        secret(&self.gemini)
    }

    pub fn replicate_secret(&self) -> Option<SecretString> {
        secret(&self.replicate)
    }
}

fn secret(key: &Option<String>) -> Option<SecretString> {
    key.as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| SecretString::from(k.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.retry.text_max_attempts, 3);
        assert_eq!(config.image.gemini_model, "imagen-4.0-standard-generate-001");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.text.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.image.default_count = 5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.base_delay_ms = 60_000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.gemini_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_keys_never_serialized_or_printed() {
        let mut config = Config::default();
        config.keys.openai = Some("sk-secret".to_string());

        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("sk-secret"));

        let debug = format!("{:?}", config.keys);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_blank_key_is_absent() {
        let keys = ApiKeys {
            gemini: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(keys.gemini_secret().is_none());
    }
}
