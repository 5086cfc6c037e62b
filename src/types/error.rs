//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provider failures are classified so the fallback chain can decide
//! between retrying the same provider and moving to the next one.
//!
//! ## Error Categories
//!
//! - **Config**: Provider not configured (skip provider)
//! - **Auth**: Credentials rejected (skip provider)
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **Transient**: Server-side 5xx (retry with backoff)
//! - **Network**: Connectivity or timeout (retry with backoff)
//! - **Unavailable**: Model or endpoint missing (skip provider)
//! - **BadRequest**: Request rejected (skip provider)
//! - **ParseError**: Empty or malformed payload (retry)

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// Longest server-suggested wait the chain will accept
const MAX_RETRY_AFTER_SECS: u64 = 300;

static RETRY_AFTER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?retry[_-]?after"?\s*[:=]\s*"?(\d+(?:\.\d+)?)"#)
        .expect("valid retry_after regex")
});

// =============================================================================
// Error Categories
// =============================================================================

/// Failure categories that drive retry and fallback decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Missing API key or disabled provider
    Config,
    /// 401/403 from the provider
    Auth,
    /// 429 from the provider
    RateLimit,
    /// 5xx from the provider
    Transient,
    /// Connection refused, DNS, timeout
    Network,
    /// 404 or unknown model
    Unavailable,
    /// 400 from the provider
    BadRequest,
    /// Response body could not be used
    ParseError,
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config => write!(f, "CONFIG"),
            Self::Auth => write!(f, "AUTH"),
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether another attempt against the same provider may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Transient | Self::Network | Self::ParseError | Self::Unknown
        )
    }

    /// Whether the chain should abandon this provider without further attempts
    pub fn skips_provider(&self) -> bool {
        !self.is_retryable()
    }

    /// Whether the failure says something about the provider's health
    ///
    /// Rejected payloads and unusable model replies are per-request and must
    /// not trip the circuit for every other caller.
    pub fn trips_circuit(&self) -> bool {
        matches!(
            self,
            Self::Auth | Self::RateLimit | Self::Transient | Self::Network
        )
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// A single failed provider call, classified for routing
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub category: ErrorCategory,
    pub message: String,
    /// Provider that produced the error
    pub provider: String,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Server-suggested wait before retrying
    pub retry_after: Option<Duration>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.provider.is_empty() {
            write!(f, "[{}] {}", self.category, self.message)
        } else {
            write!(f, "[{}:{}] {}", self.provider, self.category, self.message)
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(
        category: ErrorCategory,
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: provider.into(),
            status: None,
            retry_after: None,
        }
    }

    /// Provider is missing credentials
    pub fn not_configured(provider: impl Into<String>, env_var: &str) -> Self {
        Self::new(
            ErrorCategory::Config,
            provider,
            format!("API key not configured (set {})", env_var),
        )
    }

    /// Provider answered but the payload was unusable
    pub fn parse(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ParseError, provider, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    /// Attribute the error to a provider if it has no owner yet
    pub fn attributed_to(mut self, provider: &str) -> Self {
        if self.provider.is_empty() {
            self.provider = provider.to_string();
        }
        self
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto [`ErrorCategory`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status directly (preferred over string matching)
    pub fn classify_http_status(status: u16, body: &str, provider: &str) -> ProviderError {
        let message = format!("HTTP {}: {}", status, truncate(body, 300));
        let category = match status {
            401 | 403 => ErrorCategory::Auth,
            429 => ErrorCategory::RateLimit,
            400 | 422 => ErrorCategory::BadRequest,
            404 => ErrorCategory::Unavailable,
            408 => ErrorCategory::Network,
            500..=599 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };

        let mut err = ProviderError::new(category, provider, message).with_status(status);
        if category == ErrorCategory::RateLimit
            && let Some(wait) = retry_after_from_body(body)
        {
            err = err.retry_after(wait);
        }
        err
    }

    /// Classify a non-success response, preferring the `Retry-After` header
    /// over any hint in the body
    pub async fn classify_response(response: reqwest::Response, provider: &str) -> ProviderError {
        let status = response.status().as_u16();
        let header_wait = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after_header);
        let body = response.text().await.unwrap_or_default();

        let err = Self::classify_http_status(status, &body, provider);
        match header_wait {
            Some(wait) if err.category == ErrorCategory::RateLimit => err.retry_after(wait),
            _ => err,
        }
    }

    /// Classify a transport-level failure from reqwest
    pub fn classify_reqwest(err: &reqwest::Error, provider: &str) -> ProviderError {
        if let Some(status) = err.status() {
            return Self::classify_http_status(status.as_u16(), &err.to_string(), provider);
        }
        if err.is_decode() {
            return ProviderError::parse(provider, format!("Malformed response body: {}", err));
        }
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return ProviderError::new(ErrorCategory::Network, provider, err.to_string());
        }
        Self::classify(&err.to_string(), provider)
    }

    /// Classify a free-form error message (fallback when no status is known)
    pub fn classify(message: &str, provider: &str) -> ProviderError {
        let lower = message.to_lowercase();

        let category = if lower.contains("api key")
            || lower.contains("not configured")
            || lower.contains("missing key")
        {
            ErrorCategory::Config
        } else if lower.contains("unauthorized")
            || lower.contains("forbidden")
            || lower.contains("401")
            || lower.contains("403")
        {
            ErrorCategory::Auth
        } else if lower.contains("rate limit")
            || lower.contains("too many requests")
            || lower.contains("429")
            || lower.contains("quota")
        {
            ErrorCategory::RateLimit
        } else if lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("connection")
            || lower.contains("dns")
        {
            ErrorCategory::Network
        } else if lower.contains("503")
            || lower.contains("502")
            || lower.contains("500")
            || lower.contains("overloaded")
            || lower.contains("temporarily")
        {
            ErrorCategory::Transient
        } else if lower.contains("not found") || lower.contains("404") {
            ErrorCategory::Unavailable
        } else if lower.contains("json") || lower.contains("parse") || lower.contains("empty") {
            ErrorCategory::ParseError
        } else if lower.contains("400") || lower.contains("bad request") {
            ErrorCategory::BadRequest
        } else {
            ErrorCategory::Unknown
        };

        ProviderError::new(category, provider, message)
    }
}

/// `Retry-After` header value: delay-seconds or an HTTP date
pub fn parse_retry_after_header(value: &str) -> Option<Duration> {
    let value = value.trim();
    let secs = match value.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => {
            let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
            (at.with_timezone(&chrono::Utc) - chrono::Utc::now())
                .num_seconds()
                .max(0) as u64
        }
    };
    Some(Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

/// Explicit `retry_after` / `retry-after` / `retryAfter` field in an error body
fn retry_after_from_body(body: &str) -> Option<Duration> {
    let secs: f64 = RETRY_AFTER_FIELD.captures(body)?.get(1)?.as_str().parse().ok()?;
    Some(Duration::from_secs(
        (secs.ceil() as u64).min(MAX_RETRY_AFTER_SECS),
    ))
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

// =============================================================================
// Chain Failure Summary
// =============================================================================

/// Last failure of one provider after the chain gave up on it
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderFailure {
    pub provider: String,
    pub category: ErrorCategory,
    pub message: String,
    pub attempts: usize,
}

impl ProviderFailure {
    pub fn from_error(err: ProviderError, attempts: usize) -> Self {
        Self {
            provider: err.provider,
            category: err.category,
            message: err.message,
            attempts,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {} attempt{}): {}",
            self.provider,
            self.category,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" },
            self.message
        )
    }
}

fn summarize_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "no providers attempted".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Structured validation error with field context
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Field or component that failed validation
    pub field: Option<String>,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Validation failed for '{}': {}", field, self.message)
        } else {
            write!(f, "Validation failed: {}", self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

// =============================================================================
// API Error Codes
// =============================================================================

/// Error codes exposed to HTTP clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimitExceeded,
    ApiError,
    GenerationFailed,
    NetworkError,
    Timeout,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::ApiError => "API_ERROR",
            Self::GenerationFailed => "GENERATION_FAILED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this code
    pub fn status(&self) -> u16 {
        match self {
            Self::ValidationError | Self::InvalidInput => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::RateLimitExceeded => 429,
            Self::ApiError | Self::GenerationFailed | Self::NetworkError | Self::Timeout => 503,
            Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum EchoError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Provider Errors
    // -------------------------------------------------------------------------
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// Every provider in a chain failed
    #[error("All providers failed for {operation}: {}", summarize_failures(.failures))]
    AllProvidersFailed {
        operation: String,
        failures: Vec<ProviderFailure>,
    },

    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("{0}")]
    Validation(ValidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<ProviderError> for EchoError {
    fn from(err: ProviderError) -> Self {
        EchoError::Provider(err)
    }
}

impl From<ValidationError> for EchoError {
    fn from(err: ValidationError) -> Self {
        EchoError::Validation(err)
    }
}

pub type Result<T> = std::result::Result<T, EchoError>;

impl EchoError {
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    /// Code reported to HTTP clients
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::AllProvidersFailed { .. } => ErrorCode::GenerationFailed,
            Self::Provider(err) => match err.category {
                ErrorCategory::RateLimit => ErrorCode::RateLimitExceeded,
                ErrorCategory::Network => ErrorCode::NetworkError,
                ErrorCategory::ParseError => ErrorCode::GenerationFailed,
                _ => ErrorCode::ApiError,
            },
            Self::Io(_) | Self::Json(_) | Self::Yaml(_) | Self::Parse(_) | Self::Config(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> u16 {
        self.error_code().status()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Config.to_string(), "CONFIG");
        assert_eq!(ErrorCategory::ParseError.to_string(), "PARSE_ERROR");
    }

    #[test]
    fn test_config_and_auth_skip_provider() {
        assert!(ErrorCategory::Config.skips_provider());
        assert!(ErrorCategory::Auth.skips_provider());
        assert!(ErrorCategory::Unavailable.skips_provider());
        assert!(ErrorCategory::BadRequest.skips_provider());
        assert!(!ErrorCategory::RateLimit.skips_provider());
        assert!(!ErrorCategory::Transient.skips_provider());
        assert!(!ErrorCategory::Network.skips_provider());
        assert!(ErrorCategory::ParseError.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        let cases = [
            (401, ErrorCategory::Auth),
            (403, ErrorCategory::Auth),
            (429, ErrorCategory::RateLimit),
            (500, ErrorCategory::Transient),
            (503, ErrorCategory::Transient),
            (404, ErrorCategory::Unavailable),
            (400, ErrorCategory::BadRequest),
            (418, ErrorCategory::Unknown),
        ];
        for (status, expected) in cases {
            let err = ErrorClassifier::classify_http_status(status, "body", "deepseek");
            assert_eq!(err.category, expected, "status {}", status);
            assert_eq!(err.status, Some(status));
            assert_eq!(err.provider, "deepseek");
        }
    }

    #[test]
    fn test_rate_limit_retry_hint_from_body_field() {
        let err = ErrorClassifier::classify_http_status(
            429,
            r#"{"error":{"message":"Too many requests","retry_after": 12}}"#,
            "openai",
        );
        assert_eq!(err.retry_after, Some(Duration::from_secs(12)));

        let fractional =
            ErrorClassifier::classify_http_status(429, r#"{"retryAfter":"1.2"}"#, "gemini-imagen");
        assert_eq!(fractional.retry_after, Some(Duration::from_secs(2)));

        let capped = ErrorClassifier::classify_http_status(429, "retry-after=9000", "openai");
        assert_eq!(capped.retry_after, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_rate_limit_prose_is_not_a_hint() {
        for body in [
            r#"{"detail":"Request was throttled. Expected available in 5 seconds."}"#,
            "Please retry later. request_id=88123",
            "slow down",
        ] {
            let err = ErrorClassifier::classify_http_status(429, body, "replicate-flux");
            assert_eq!(err.retry_after, None, "{}", body);
        }
    }

    #[test]
    fn test_retry_after_header_values() {
        assert_eq!(parse_retry_after_header(" 7 "), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after_header("86400"), Some(Duration::from_secs(300)));
        assert_eq!(
            parse_retry_after_header("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after_header("soon"), None);
    }

    #[test]
    fn test_only_health_failures_trip_circuit() {
        assert!(ErrorCategory::Transient.trips_circuit());
        assert!(ErrorCategory::Network.trips_circuit());
        assert!(ErrorCategory::RateLimit.trips_circuit());
        assert!(ErrorCategory::Auth.trips_circuit());
        assert!(!ErrorCategory::BadRequest.trips_circuit());
        assert!(!ErrorCategory::ParseError.trips_circuit());
        assert!(!ErrorCategory::Config.trips_circuit());
    }

    #[test]
    fn test_classify_message() {
        assert_eq!(
            ErrorClassifier::classify("Connection timed out", "x").category,
            ErrorCategory::Network
        );
        assert_eq!(
            ErrorClassifier::classify("Service unavailable (503)", "x").category,
            ErrorCategory::Transient
        );
        assert_eq!(
            ErrorClassifier::classify("Unauthorized", "x").category,
            ErrorCategory::Auth
        );
        assert_eq!(
            ErrorClassifier::classify("Empty response", "x").category,
            ErrorCategory::ParseError
        );
        assert_eq!(
            ErrorClassifier::classify("Something weird happened", "x").category,
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ErrorCategory::RateLimit, "openai", "Too many requests");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let anon = ProviderError::parse("", "bad json");
        assert_eq!(anon.to_string(), "[PARSE_ERROR] bad json");
        assert_eq!(anon.attributed_to("gemini").provider, "gemini");
    }

    #[test]
    fn test_all_providers_failed_lists_each_provider() {
        let err = EchoError::AllProvidersFailed {
            operation: "image generation".to_string(),
            failures: vec![
                ProviderFailure {
                    provider: "gemini-imagen".to_string(),
                    category: ErrorCategory::Config,
                    message: "API key not configured".to_string(),
                    attempts: 0,
                },
                ProviderFailure {
                    provider: "replicate-flux".to_string(),
                    category: ErrorCategory::Transient,
                    message: "HTTP 503".to_string(),
                    attempts: 3,
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("gemini-imagen (CONFIG, 0 attempts)"));
        assert!(text.contains("replicate-flux (TRANSIENT, 3 attempts): HTTP 503"));
        assert_eq!(err.error_code(), ErrorCode::GenerationFailed);
        assert_eq!(err.status_code(), 503);
    }

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::ValidationError.status(), 400);
        assert_eq!(ErrorCode::InvalidInput.status(), 400);
        assert_eq!(ErrorCode::Unauthorized.status(), 401);
        assert_eq!(ErrorCode::Forbidden.status(), 403);
        assert_eq!(ErrorCode::NotFound.status(), 404);
        assert_eq!(ErrorCode::RateLimitExceeded.status(), 429);
        assert_eq!(ErrorCode::Timeout.status(), 503);
        assert_eq!(ErrorCode::InternalError.status(), 500);
        assert_eq!(
            EchoError::validation("answers empty").error_code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            EchoError::NotFound("echo".into()).error_code().as_str(),
            "NOT_FOUND"
        );
    }
}
