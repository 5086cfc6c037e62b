//! Echo personality (flat profile shared by every generation flow)

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Flat personality profile consumed by image prompts and saved echoes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoPersonality {
    pub name: String,
    pub tagline: String,
    pub keywords: Vec<String>,
    pub communication_style: String,
    pub values: String,
    pub why_match: String,
    pub unique_traits: String,
}

impl EchoPersonality {
    pub const NAME_MAX_CHARS: usize = 50;
    pub const TAGLINE_MAX_CHARS: usize = 100;
    pub const KEYWORDS_MIN: usize = 3;
    pub const KEYWORDS_MAX: usize = 7;
    pub const DESCRIPTION_MIN_CHARS: usize = 10;

    /// Check length limits on every field
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_len("name", &self.name, 1, Self::NAME_MAX_CHARS)?;
        check_len("tagline", &self.tagline, 1, Self::TAGLINE_MAX_CHARS)?;

        let count = self.keywords.len();
        if !(Self::KEYWORDS_MIN..=Self::KEYWORDS_MAX).contains(&count) {
            return Err(ValidationError::field(
                "keywords",
                format!(
                    "expected {}-{} keywords, got {}",
                    Self::KEYWORDS_MIN,
                    Self::KEYWORDS_MAX,
                    count
                ),
            ));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ValidationError::field("keywords", "keywords must not be blank"));
        }

        for (field, value) in [
            ("communicationStyle", &self.communication_style),
            ("values", &self.values),
            ("whyMatch", &self.why_match),
            ("uniqueTraits", &self.unique_traits),
        ] {
            check_len(field, value, Self::DESCRIPTION_MIN_CHARS, usize::MAX)?;
        }

        Ok(())
    }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if len < min {
        return Err(ValidationError::field(
            field,
            format!("must be at least {} characters", min),
        ));
    }
    if len > max {
        return Err(ValidationError::field(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_personality() -> EchoPersonality {
        EchoPersonality {
            name: "林知夏".to_string(),
            tagline: "安静但靠谱的陪伴者".to_string(),
            keywords: vec!["温柔".into(), "靠谱".into(), "细心".into()],
            communication_style: "说话慢条斯理，喜欢先听你说完再回应".to_string(),
            values: "重视长期陪伴与彼此成长，相信细水长流".to_string(),
            why_match: "能给你稳定的安全感，也尊重你的独处时间".to_string(),
            unique_traits: "会记住你随口说过的小事，然后某天悄悄兑现".to_string(),
        }
    }

    #[test]
    fn test_valid_personality() {
        assert!(sample_personality().validate().is_ok());
    }

    #[test]
    fn test_keyword_bounds() {
        let mut p = sample_personality();
        p.keywords.truncate(2);
        let err = p.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("keywords"));

        p.keywords = (0..8).map(|i| format!("k{}", i)).collect();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_length_limits_count_characters() {
        let mut p = sample_personality();
        // 50 CJK characters is 150 bytes but within the limit
        p.name = "夏".repeat(50);
        assert!(p.validate().is_ok());

        p.name = "夏".repeat(51);
        assert_eq!(p.validate().unwrap_err().field.as_deref(), Some("name"));

        let mut p = sample_personality();
        p.values = "太短".to_string();
        assert_eq!(p.validate().unwrap_err().field.as_deref(), Some("values"));
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = serde_json::to_value(sample_personality()).unwrap();
        assert!(json.get("communicationStyle").is_some());
        assert!(json.get("whyMatch").is_some());
        assert!(json.get("uniqueTraits").is_some());
    }
}
