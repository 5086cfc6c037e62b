//! Big Five personality profile
//!
//! Output of the personality flow: Big Five scores plus grounded, everyday
//! behavioural detail.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::lenient_string;
use super::personality::EchoPersonality;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(default)]
    pub vibe: String,
    pub tagline: String,

    pub big_five: BigFiveScores,
    pub life_details: LifeDetails,
    pub communication: CommunicationProfile,
    pub personality: PersonalitySummary,
    pub typical_behaviors: TypicalBehaviors,
    pub together_scenes: TogetherScenes,
    pub why_match: WhyMatch,
    pub unique_details: UniqueDetails,
}

/// Scores on a 1-10 scale; low neuroticism means emotionally stable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BigFiveScores {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
}

impl BigFiveScores {
    pub const MIN: f32 = 1.0;
    pub const MAX: f32 = 10.0;

    fn named(&self) -> [(&'static str, f32); 5] {
        [
            ("openness", self.openness),
            ("conscientiousness", self.conscientiousness),
            ("extraversion", self.extraversion),
            ("agreeableness", self.agreeableness),
            ("neuroticism", self.neuroticism),
        ]
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in self.named() {
            if !(Self::MIN..=Self::MAX).contains(&value) {
                return Err(ValidationError::field(
                    format!("bigFive.{}", name),
                    format!("score {} outside {}-{}", value, Self::MIN, Self::MAX),
                ));
            }
        }
        Ok(())
    }

    /// Plain-language reading of the scores; middling scores say nothing
    pub fn interpret(&self) -> String {
        let mut notes = Vec::new();

        if self.openness >= 7.0 {
            notes.push("喜欢尝试新事物，有创造力");
        } else if self.openness <= 4.0 {
            notes.push("更喜欢熟悉的事物，偏实际");
        }

        if self.conscientiousness >= 7.0 {
            notes.push("自律、有计划性、靠谱");
        } else if self.conscientiousness <= 4.0 {
            notes.push("随性、灵活、不太喜欢条条框框");
        }

        if self.extraversion >= 7.0 {
            notes.push("外向、喜欢社交、精力充沛");
        } else if self.extraversion <= 4.0 {
            notes.push("内向、独处充电、深度交流");
        }

        if self.agreeableness >= 7.0 {
            notes.push("善解人意、愿意妥协");
        } else if self.agreeableness <= 4.0 {
            notes.push("坚持己见、直接表达");
        }

        // inverted: low is stable
        if self.neuroticism <= 4.0 {
            notes.push("情绪稳定、不容易焦虑");
        } else if self.neuroticism >= 7.0 {
            notes.push("情绪敏感、容易受影响");
        }

        notes.join("；")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifeDetails {
    pub routine: Routine,
    pub social: SocialHabits,
    pub decision: DecisionHabits,
    pub emotion: EmotionHabits,
    pub interests: Interests,
    pub daily_habits: DailyHabits,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Routine {
    pub sleep_pattern: String,
    pub weekend_style: Vec<String>,
    pub room_tidiness: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialHabits {
    pub energy_source: String,
    pub social_media_style: String,
    pub problem_solving_style: String,
    pub friend_circle_size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecisionHabits {
    pub planning_style: String,
    pub task_handling: String,
    pub travel_prep: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmotionHabits {
    pub stress_response: String,
    pub coping_methods: Vec<String>,
    pub criticism_reaction: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Interests {
    pub attitude_to_new: String,
    pub hobby_types: Vec<String>,
    pub curiosity_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyHabits {
    pub eating: Vec<String>,
    pub shopping: String,
    pub caffeine: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_preference: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunicationProfile {
    pub speaking: Speaking,
    pub conflict_style: String,
    pub relationship_pattern: RelationshipPattern,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Speaking {
    pub volume: String,
    pub pace: String,
    pub response_time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipPattern {
    pub ideal_frequency: String,
    pub focus_on: String,
    pub help_style: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalitySummary {
    pub core_traits: Vec<String>,
    pub strengths_and_weaknesses: StrengthsAndWeaknesses,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthsAndWeaknesses {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypicalBehaviors {
    pub morning_routine: String,
    pub evening_routine: String,
    pub weekend_activity: String,
    pub stressed_moment: String,
    pub happy_moment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TogetherScenes {
    pub daily_chat: String,
    pub when_you_sad: String,
    pub when_you_happy: String,
    pub weekend_plan: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhyMatch {
    pub lifestyle_match: String,
    pub emotional_match: String,
    pub value_match: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UniqueDetails {
    pub catchphrase: String,
    pub quirky_habit: String,
    pub favorite_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comfort_food: Option<String>,
}

impl ProfessionalProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::field("name", "must not be empty"));
        }
        if self.tagline.trim().is_empty() {
            return Err(ValidationError::field("tagline", "must not be empty"));
        }
        self.big_five.validate()?;
        if self.personality.core_traits.is_empty() {
            return Err(ValidationError::field(
                "personality.coreTraits",
                "at least one trait is required",
            ));
        }
        if self.together_scenes.daily_chat.trim().is_empty() {
            return Err(ValidationError::field(
                "togetherScenes.dailyChat",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Flatten into the shared personality shape
    pub fn to_echo_personality(&self) -> EchoPersonality {
        EchoPersonality {
            name: self.name.clone(),
            tagline: self.tagline.clone(),
            keywords: self.personality.core_traits.clone(),
            communication_style: self.together_scenes.daily_chat.clone(),
            values: self.why_match.value_match.clone(),
            why_match: format!(
                "{} {}",
                self.why_match.lifestyle_match, self.why_match.emotional_match
            ),
            unique_traits: format!(
                "{}。{}",
                self.unique_details.catchphrase, self.unique_details.quirky_habit
            ),
        }
    }

    /// Short lines for profile cards
    pub fn highlights(&self) -> Vec<String> {
        vec![
            self.personality
                .core_traits
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join("、"),
            self.together_scenes.when_you_sad.clone(),
            self.unique_details.catchphrase.clone(),
            format!("治愈时刻：{}", self.unique_details.favorite_time),
        ]
    }

    /// One-paragraph bio used when sharing
    pub fn short_bio(&self) -> String {
        let traits = self
            .personality
            .core_traits
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join("、");
        format!(
            "{}，{}。{}。{}",
            self.name, self.tagline, traits, self.why_match.emotional_match
        )
    }
}
