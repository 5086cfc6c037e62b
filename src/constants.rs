//! Global Constants
//!
//! Centralized constants for provider endpoints, retry tuning and limits.

/// Provider chain constants
pub mod chain {
    /// Hard cap on attempts across every provider in one chain run
    pub const MAX_TOTAL_ATTEMPTS: usize = 16;

    /// Default attempts per text provider
    pub const TEXT_MAX_ATTEMPTS: u8 = 3;

    /// Default attempts per Replicate model
    pub const IMAGE_MAX_ATTEMPTS: u8 = 3;

    /// Pollinations only builds URLs, a second try never helps
    pub const POLLINATIONS_MAX_ATTEMPTS: u8 = 1;

    /// Gemini image preview quota is tight, fall through quickly
    pub const GEMINI_MAX_ATTEMPTS: u8 = 1;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1000;

    /// Maximum delay between retries (milliseconds)
    pub const MAX_DELAY_MS: u64 = 30_000;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;

    /// Fraction of the current delay used as the jitter ceiling
    pub const JITTER_RATIO: f64 = 0.25;
}

/// Circuit breaker constants
pub mod circuit_breaker {
    /// Consecutive failures before the circuit opens
    pub const FAILURE_THRESHOLD: u32 = 5;

    /// Seconds an open circuit waits before trying again
    pub const RECOVERY_TIMEOUT_SECS: u64 = 30;

    /// Trial requests allowed while half-open
    pub const HALF_OPEN_MAX_REQUESTS: u32 = 3;

    /// Successes needed in half-open to close
    pub const SUCCESS_THRESHOLD: u32 = 2;
}

/// HTTP/Network constants
pub mod network {
    /// Text completion request timeout (seconds)
    pub const TEXT_TIMEOUT_SECS: u64 = 120;

    /// Image generation request timeout (seconds)
    pub const IMAGE_TIMEOUT_SECS: u64 = 120;

    /// Connection timeout (seconds)
    pub const CONNECTION_TIMEOUT_SECS: u64 = 30;

    /// Deadline for one whole chain run, fallbacks included (seconds)
    pub const OPERATION_TIMEOUT_SECS: u64 = 600;

    /// Interval between Replicate prediction polls (milliseconds)
    pub const REPLICATE_POLL_INTERVAL_MS: u64 = 1000;

    /// Polls before a pending prediction is abandoned
    pub const REPLICATE_MAX_POLLS: usize = 60;
}

/// Text generation constants
pub mod text {
    pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

    pub const DEEPSEEK_REASONER_MODEL: &str = "deepseek-reasoner";
    pub const DEEPSEEK_CHAT_MODEL: &str = "deepseek-chat";
    pub const OPENAI_MODEL: &str = "gpt-4o";

    /// Reasoner spends tokens on its chain of thought
    pub const REASONER_MAX_TOKENS: usize = 8000;
    pub const CHAT_MAX_TOKENS: usize = 4000;

    /// Sampling temperature for partner synthesis
    pub const PARTNER_TEMPERATURE: f32 = 0.7;

    /// Sampling temperature for the Big Five personality flow
    pub const PERSONALITY_TEMPERATURE: f32 = 0.8;
}

/// Image generation constants
pub mod image {
    pub const POLLINATIONS_BASE_URL: &str = "https://image.pollinations.ai";
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const REPLICATE_BASE_URL: &str = "https://api.replicate.com/v1";

    pub const POLLINATIONS_MODEL: &str = "turbo";
    pub const GEMINI_MODEL: &str = "imagen-4.0-standard-generate-001";
    pub const FLUX_MODEL: &str = "black-forest-labs/flux-1.1-pro";
    pub const SDXL_VERSION: &str =
        "39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";

    /// Images per request when the caller does not say
    pub const DEFAULT_COUNT: u8 = 1;

    /// Upper bound on images per request
    pub const MAX_COUNT: u8 = 4;

    /// Pollinations URLs longer than this are often rejected
    pub const MAX_URL_LEN: usize = 2000;

    /// Scene prompts are shortened past this many characters
    pub const SCENE_PROMPT_MAX_CHARS: usize = 100;

    /// Replicate Flux output quality
    pub const FLUX_OUTPUT_QUALITY: u8 = 90;
}

/// Interview constants
pub mod interview {
    /// Minimum answers for the Big Five personality flow
    pub const MIN_PERSONALITY_ANSWERS: usize = 20;
}

/// Saved echo constants
pub mod store {
    /// Saved echoes kept in memory; the oldest is evicted past this
    pub const MAX_SAVED_ECHOES: usize = 1000;
}

/// HTTP server constants
pub mod server {
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 3000;
}
