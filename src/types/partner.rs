//! Ideal partner profile
//!
//! The rich profile produced by the partner-matching flow. Top-level sections
//! are mandatory; fields inside a section default to empty so a model that
//! drops one sentence does not sink the whole profile.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::lenient_string;
use super::personality::EchoPersonality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProfile {
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(default)]
    pub vibe: String,
    pub tagline: String,

    pub core_personality: CorePersonality,
    pub emotional_support: EmotionalSupport,
    pub communication_style: PartnerCommunication,
    pub lifestyle_compatibility: LifestyleCompatibility,
    pub unique_qualities: UniqueQualities,
    pub relationship_dynamics: RelationshipDynamics,
    pub why_perfect_match: WhyPerfectMatch,
    pub love_language: LoveLanguage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_life_scenes: Option<DailyLifeScenes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_details: Option<InteractionDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub living_together: Option<LivingTogether>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deeper_traits: Option<DeeperTraits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_examples: Option<ConversationExamples>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorePersonality {
    pub attachment_style: String,
    pub primary_traits: Vec<String>,
    pub complementary_traits: Vec<String>,
    pub loving_style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmotionalSupport {
    pub when_you_anxious: String,
    pub when_you_sad: String,
    pub when_you_happy: String,
    pub daily_support: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartnerCommunication {
    pub speaking_pattern: String,
    pub listening_style: String,
    pub conflict_handling: String,
    pub expression_style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifestyleCompatibility {
    pub daily_rhythm: String,
    pub social_style: String,
    pub hobby_sharing: String,
    pub space_balance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UniqueQualities {
    pub strengths: Vec<String>,
    pub adorable_flaws: Vec<String>,
    pub daily_habits: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipDynamics {
    pub intimacy_level: String,
    pub growth_together: String,
    pub conflict_resolution: String,
    pub future_vision: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhyPerfectMatch {
    pub attachment_match: String,
    pub emotional_match: String,
    pub communication_match: String,
    pub lifestyle_match: String,
    pub growth_match: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoveLanguage {
    pub primary: String,
    pub secondary: String,
    pub expression: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyLifeScenes {
    pub morning_routine: String,
    pub evening_routine: String,
    pub weekend_activity: String,
    pub cooking_together: String,
    pub quiet_moments: String,
    pub playful_moments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionDetails {
    pub how_they_greet: String,
    pub how_they_say_goodbye: String,
    pub how_they_show_care: String,
    pub how_they_apologize: String,
    pub how_they_celebrate: String,
    pub how_they_comfort: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivingTogether {
    pub morning_scene: String,
    pub evening_scene: String,
    pub weekend_scene: String,
    pub chore_distribution: String,
    pub personal_space: String,
    pub shared_activities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeeperTraits {
    pub hidden_talents: Vec<String>,
    pub quirks: Vec<String>,
    pub pet_peeves: Vec<String>,
    pub random_facts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversationExamples {
    pub daily_check_in: String,
    pub deep_talk: String,
    pub playful_teasing: String,
    pub conflict_example: String,
    pub supportive_words: String,
}

impl PartnerProfile {
    /// Minimal completeness check applied to model output
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("nickname", &self.nickname),
            ("tagline", &self.tagline),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::field(field, "must not be empty"));
            }
        }
        if self
            .core_personality
            .primary_traits
            .iter()
            .all(|t| t.trim().is_empty())
        {
            return Err(ValidationError::field(
                "corePersonality.primaryTraits",
                "at least one trait is required",
            ));
        }
        Ok(())
    }

    /// Flatten into the shared personality shape
    pub fn to_echo_personality(&self) -> EchoPersonality {
        let qualities = &self.unique_qualities;
        EchoPersonality {
            name: self.name.clone(),
            tagline: self.tagline.clone(),
            keywords: self.core_personality.primary_traits.clone(),
            communication_style: format!(
                "{}。{}",
                self.communication_style.speaking_pattern,
                self.communication_style.listening_style
            ),
            values: format!(
                "{}，{}",
                self.love_language.primary, self.relationship_dynamics.intimacy_level
            ),
            why_match: self.why_perfect_match.emotional_match.clone(),
            unique_traits: format!(
                "{}。{}。{}",
                qualities.strengths.join("；"),
                qualities.adorable_flaws.join("；"),
                qualities.daily_habits.join("；")
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_partner_json() -> serde_json::Value {
        serde_json::json!({
            "name": "沈念",
            "nickname": "阿念",
            "age": 26,
            "vibe": "温暖邻家",
            "tagline": "在你需要的时候一直都在",
            "corePersonality": {
                "attachmentStyle": "安全型依恋",
                "primaryTraits": ["温柔", "稳定", "细心"],
                "complementaryTraits": ["果断"],
                "lovingStyle": "用行动表达"
            },
            "emotionalSupport": {
                "whenYouAnxious": "安静地陪着你",
                "whenYouSad": "温柔地抱抱你",
                "whenYouHappy": "和你一起笑",
                "dailySupport": "记得你的小习惯"
            },
            "communicationStyle": {
                "speakingPattern": "语气温和",
                "listeningStyle": "专注倾听",
                "conflictHandling": "先冷静再沟通",
                "expressionStyle": "用行动和细节表达"
            },
            "lifestyleCompatibility": {
                "dailyRhythm": "早睡早起",
                "socialStyle": "喜欢去公园散步",
                "hobbySharing": "一起看电影",
                "spaceBalance": "尊重彼此空间"
            },
            "uniqueQualities": {
                "strengths": ["靠谱", "耐心"],
                "adorableFlaws": ["有点路痴"],
                "dailyHabits": ["睡前看书"]
            },
            "relationshipDynamics": {
                "intimacyLevel": "循序渐进",
                "growthTogether": "一起学习",
                "conflictResolution": "坦诚沟通",
                "futureVision": "平淡而温暖"
            },
            "whyPerfectMatch": {
                "attachmentMatch": "给你安全感",
                "emotionalMatch": "能接住你的情绪",
                "communicationMatch": "愿意倾听",
                "lifestyleMatch": "作息一致",
                "growthMatch": "共同成长"
            },
            "loveLanguage": {
                "primary": "精心时刻",
                "secondary": "服务行动",
                "expression": "周末为你做饭"
            },
            "dailyLifeScenes": {
                "morningRoutine": "早晨泡一壶茶",
                "quietMoments": "在书店里安静看书",
                "weekendActivity": "去公园散步"
            }
        })
    }

    pub(crate) fn sample_partner() -> PartnerProfile {
        serde_json::from_value(sample_partner_json()).unwrap()
    }

    #[test]
    fn test_deserialize_with_numeric_age_and_partial_sections() {
        let partner = sample_partner();
        assert_eq!(partner.age, "26");
        let scenes = partner.daily_life_scenes.as_ref().unwrap();
        assert_eq!(scenes.cooking_together, "");
        assert!(partner.living_together.is_none());
        assert!(partner.validate().is_ok());
    }

    #[test]
    fn test_missing_required_section_fails() {
        let mut json = sample_partner_json();
        json.as_object_mut().unwrap().remove("loveLanguage");
        assert!(serde_json::from_value::<PartnerProfile>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_identity() {
        let mut partner = sample_partner();
        partner.nickname = "  ".to_string();
        assert_eq!(
            partner.validate().unwrap_err().field.as_deref(),
            Some("nickname")
        );

        let mut partner = sample_partner();
        partner.core_personality.primary_traits.clear();
        assert!(partner.validate().is_err());
    }

    #[test]
    fn test_to_echo_personality() {
        let echo = sample_partner().to_echo_personality();
        assert_eq!(echo.keywords, vec!["温柔", "稳定", "细心"]);
        assert_eq!(echo.communication_style, "语气温和。专注倾听");
        assert_eq!(echo.values, "精心时刻，循序渐进");
        assert_eq!(echo.why_match, "能接住你的情绪");
        assert_eq!(echo.unique_traits, "靠谱；耐心。有点路痴。睡前看书");
    }

    #[test]
    fn test_optional_sections_omitted_on_output() {
        let json = serde_json::to_value(sample_partner()).unwrap();
        assert!(json.get("livingTogether").is_none());
        assert!(json.get("dailyLifeScenes").is_some());
    }
}
