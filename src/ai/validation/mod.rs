//! Model output validation
//!
//! Structured output is extracted with [`extract_json`] and then checked by
//! the owning type's `validate()`. Both failures surface as
//! `ErrorCategory::ParseError` on the provider that produced the output.

mod json_repair;

pub use json_repair::{JsonRepairer, extract_as, extract_json};

use serde::de::DeserializeOwned;

use crate::types::{ProviderError, ValidationError};

/// Extract, deserialize and validate a model response in one step
///
/// Any failure is reported against `provider` as a parse error so the chain
/// retries or falls back.
pub fn parse_validated<T, F>(
    provider: &str,
    content: &str,
    validate: F,
) -> std::result::Result<T, ProviderError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> std::result::Result<(), ValidationError>,
{
    let parsed: T = extract_as(content).map_err(|e| ProviderError::parse(provider, e.to_string()))?;
    validate(&parsed).map_err(|e| {
        ProviderError::parse(provider, format!("invalid structured output: {}", e))
    })?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EchoPersonality, ErrorCategory};

    #[test]
    fn test_parse_validated_accepts_good_output() {
        let content = serde_json::to_string(
            &crate::types::personality::tests::sample_personality(),
        )
        .unwrap();
        let echo: EchoPersonality =
            parse_validated("deepseek", &content, EchoPersonality::validate).unwrap();
        assert_eq!(echo.keywords.len(), 3);
    }

    #[test]
    fn test_parse_validated_reports_parse_error() {
        let err = parse_validated::<EchoPersonality, _>("deepseek", "not json", |_| Ok(()))
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::ParseError);
        assert_eq!(err.provider, "deepseek");

        let mut bad = crate::types::personality::tests::sample_personality();
        bad.keywords = vec!["一".to_string()];
        let content = serde_json::to_string(&bad).unwrap();
        let err = parse_validated("openai", &content, EchoPersonality::validate).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ParseError);
        assert!(err.message.contains("invalid structured output"));
    }
}
