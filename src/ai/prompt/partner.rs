//! Ideal partner prompts
//!
//! The questionnaire asks about the user. Four small analyses turn those
//! answers into hints about the partner the model should write: attachment
//! style, emotional needs, complementary traits and stated preferences.

use super::{PromptBuilder, answers_by_category};
use crate::ai::text::TextRequest;
use crate::constants::text::PARTNER_TEMPERATURE;
use crate::interview::{Category, QuestionBank};
use crate::types::{Answer, find_answer};

const PARTNER_SCHEMA: &str = r#"
{
  "name": "中文名", "nickname": "昵称", "age": "26-30", "vibe": "气质", "tagline": "一句话描述",
  "corePersonality": {"attachmentStyle": "", "primaryTraits": [""], "complementaryTraits": [""], "lovingStyle": ""},
  "emotionalSupport": {"whenYouAnxious": "", "whenYouSad": "", "whenYouHappy": "", "dailySupport": ""},
  "communicationStyle": {"speakingPattern": "", "listeningStyle": "", "conflictHandling": "", "expressionStyle": ""},
  "lifestyleCompatibility": {"dailyRhythm": "", "socialStyle": "", "hobbySharing": "", "spaceBalance": ""},
  "uniqueQualities": {"strengths": [""], "adorableFlaws": [""], "dailyHabits": [""]},
  "relationshipDynamics": {"intimacyLevel": "", "growthTogether": "", "conflictResolution": "", "futureVision": ""},
  "whyPerfectMatch": {"attachmentMatch": "", "emotionalMatch": "", "communicationMatch": "", "lifestyleMatch": "", "growthMatch": ""},
  "loveLanguage": {"primary": "", "secondary": "", "expression": ""},
  "dailyLifeScenes": {"morningRoutine": "", "eveningRoutine": "", "weekendActivity": "", "cookingTogether": "", "quietMoments": "", "playfulMoments": ""},
  "interactionDetails": {"howTheyGreet": "", "howTheySayGoodbye": "", "howTheyShowCare": "", "howTheyApologize": "", "howTheyCelebrate": "", "howTheyComfort": ""},
  "livingTogether": {"morningScene": "", "eveningScene": "", "weekendScene": "", "choreDistribution": "", "personalSpace": "", "sharedActivities": [""]},
  "deeperTraits": {"hiddenTalents": [""], "quirks": [""], "petPeeves": [""], "randomFacts": [""]},
  "conversationExamples": {"dailyCheckIn": "", "deepTalk": "", "playfulTeasing": "", "conflictExample": "", "supportiveWords": ""}
}
"#;

pub fn partner_system_prompt() -> String {
    PromptBuilder::new()
        .role(
            "专业的关系心理学家",
            "擅长基于依恋理论、人格互补原理和关系心理学进行伴侣匹配分析",
        )
        .principles(
            "匹配原则",
            &[
                "安全型 → 情绪稳定、可靠、支持性强的伴侣",
                "焦虑型 → 耐心、包容、善于给予安全感的伴侣",
                "回避型 → 尊重独立、理解空间需求的伴侣",
                "混乱型 → 稳定、一致、能提供情感安全的伴侣",
                "核心价值观相似，弱项上互补",
            ],
        )
        .principles(
            "输出风格",
            &[
                "具体的行为描述和生活场景，包含对话示例",
                "真实的人格特征，包括可爱的小缺点",
                "避免完美化形象和空洞的形容词",
            ],
        )
        .text("必须严格按照 JSON schema 输出，所有字段必须填写完整。")
        .build()
}

/// System and user prompt for partner synthesis
pub fn partner_prompt(answers: &[Answer], bank: &QuestionBank) -> TextRequest {
    let analysis = [
        ("依恋风格分析", analyze_attachment(answers)),
        ("情感需求分析", analyze_emotional_needs(answers)),
        ("互补性需求分析", analyze_complementarity(answers)),
        ("偏好特征分析", analyze_preferences(answers, bank)),
    ]
    .iter()
    .map(|(title, body)| format!("### {}\n{}", title, body.trim_end()))
    .collect::<Vec<_>>()
    .join("\n\n");

    let prompt = PromptBuilder::new()
        .text("用户完成了一次基于关系心理学的深度访谈，目的是找到与其匹配的理想伴侣人格。以下是分析结果：")
        .section("用户访谈回答", &answers_by_category(answers, bank))
        .section("心理学分析", &analysis)
        .text("**请基于以上分析，生成一个与用户高度匹配的理想伴侣人格档案。**")
        .schema(PARTNER_SCHEMA)
        .rules(&[
            "所有描述必须基于用户的实际回答和心理分析",
            "伴侣特质要与用户的需求高度匹配",
            "描述要具体、生活化，有真实的情感温度",
            "每个字段都要填写完整",
        ])
        .build();

    TextRequest {
        system: partner_system_prompt(),
        prompt,
        temperature: PARTNER_TEMPERATURE,
    }
}

/// Attachment pattern from p001
pub fn analyze_attachment(answers: &[Answer]) -> String {
    let mut analysis = String::from("基于用户在亲密关系中的表现：\n");
    let pattern = find_answer(answers, "p001").and_then(|a| a.answer.as_text());

    if let Some(value) = pattern {
        let line = if value.contains("anxious") {
            Some("表现出焦虑型依恋特征：容易担心关系，需要经常确认")
        } else if value.contains("avoidant") {
            Some("表现出回避型依恋特征：重视独立，不喜欢过度依赖")
        } else if value.contains("secure") {
            Some("表现出安全型依恋特征：能够平衡独立和亲密")
        } else if value.contains("disorganized") {
            Some("表现出混乱型依恋特征：对亲密关系有矛盾情感")
        } else {
            None
        };
        if let Some(line) = line {
            analysis.push_str(&format!("- {}\n", line));
        }
    }
    analysis
}

const EMOTIONAL_NEEDS: &[(&str, &str)] = &[
    ("security", "最需要安全感和稳定感"),
    ("understanding", "最需要理解和共鸣"),
    ("freedom", "最需要自由和空间"),
    ("attention", "最需要陪伴和关注"),
    ("growth", "最需要成长和激励"),
    ("active_help", "最需要主动的关心和帮助"),
    ("silent_support", "最需要安静的陪伴和理解"),
    ("space", "最需要自由和空间"),
    ("distraction", "最需要轻松和快乐"),
    ("physical_comfort", "最需要拥抱和身体上的安慰"),
];

/// Core emotional need from p003
pub fn analyze_emotional_needs(answers: &[Answer]) -> String {
    let mut analysis = String::from("用户的核心情感需求：\n");
    let need = find_answer(answers, "p003")
        .and_then(|a| a.answer.as_text())
        .and_then(|value| {
            EMOTIONAL_NEEDS
                .iter()
                .find(|(key, _)| value.contains(key))
                .map(|(_, line)| *line)
        });

    if let Some(line) = need {
        analysis.push_str(&format!("- {}\n", line));
    }
    analysis
}

/// (trait the user has, trait that cancels it, note)
const COMPLEMENTS: &[(&str, &str, &str)] = &[
    (
        "user_introverted",
        "user_extroverted",
        "用户较内向，可能需要适度外向的伴侣带来社交活力",
    ),
    (
        "user_anxious",
        "user_stable",
        "用户容易焦虑，需要情绪稳定的伴侣提供安全感",
    ),
    (
        "user_indecisive",
        "user_decisive",
        "用户不够果断，需要更果断的伴侣帮助决策",
    ),
    (
        "user_rational",
        "user_romantic",
        "用户较理性，可能需要更感性的伴侣带来浪漫",
    ),
    (
        "user_spontaneous",
        "user_planned",
        "用户较随性，可能需要更有计划性的伴侣规划生活",
    ),
    (
        "user_serious",
        "user_humorous",
        "用户较严肃，可能需要更幽默的伴侣带来快乐",
    ),
];

/// Complementary partner traits inferred from the p007 self-description
pub fn analyze_complementarity(answers: &[Answer]) -> String {
    let mut analysis = String::from("基于用户的性格特征，推断需要的互补特质：\n");
    let Some(traits) = find_answer(answers, "p007").map(|a| &a.answer) else {
        return analysis;
    };

    for (has, unless, note) in COMPLEMENTS {
        if traits.has_choice(has) && !traits.has_choice(unless) {
            analysis.push_str(&format!("- {}\n", note));
        }
    }
    if traits.has_choice("user_extroverted") {
        analysis.push_str("- 用户较外向，伴侣可以是外向或内向（都能匹配）\n");
    }
    if traits.has_choice("user_stable") {
        analysis.push_str("- 用户情绪稳定，伴侣也应该是稳定的\n");
    }
    analysis
}

/// Communication, lifestyle and values answers restated as preferences
pub fn analyze_preferences(answers: &[Answer], bank: &QuestionBank) -> String {
    let mut analysis = String::from("用户的沟通和生活偏好：\n");

    for answer in answers {
        let Some(question) = bank.get(&answer.question_id) else {
            continue;
        };
        if matches!(
            question.category,
            Category::Communication | Category::Lifestyle | Category::Values
        ) {
            analysis.push_str(&format!(
                "- {}：{}\n",
                question.text,
                answer.answer.joined()
            ));
        }
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_attachment_patterns() {
        let cases = [
            ("user_anxious_pattern", "焦虑型"),
            ("user_avoidant_pattern", "回避型"),
            ("user_secure_pattern", "安全型"),
            ("user_disorganized_pattern", "混乱型"),
        ];
        for (value, expected) in cases {
            let analysis = analyze_attachment(&[Answer::new("p001", value)]);
            assert!(analysis.contains(expected), "{}", value);
        }

        let none = analyze_attachment(&[Answer::new("p002", "user_anxious_response")]);
        assert_eq!(none, "基于用户在亲密关系中的表现：\n");
    }

    #[test]
    fn test_emotional_needs_match_bank_values() {
        let analysis = analyze_emotional_needs(&[Answer::new("p003", "user_needs_space")]);
        assert!(analysis.contains("最需要自由和空间"));

        let analysis =
            analyze_emotional_needs(&[Answer::new("p003", "user_needs_silent_support")]);
        assert!(analysis.contains("安静的陪伴"));

        let analysis = analyze_emotional_needs(&[Answer::new("p003", "wants_security")]);
        assert!(analysis.contains("安全感和稳定感"));
    }

    #[test]
    fn test_complementarity_rules() {
        let answers = vec![Answer::new(
            "p007",
            choices(&["user_introverted", "user_anxious", "user_stable", "user_serious"]),
        )];
        let analysis = analyze_complementarity(&answers);

        assert!(analysis.contains("适度外向"));
        assert!(!analysis.contains("容易焦虑"), "stable cancels anxious");
        assert!(analysis.contains("更幽默"));
        assert!(analysis.contains("伴侣也应该是稳定的"));
        assert!(!analysis.contains("都能匹配"));
    }

    #[test]
    fn test_complementarity_ignores_text_answer() {
        let analysis = analyze_complementarity(&[Answer::new("p007", "user_introverted")]);
        assert!(analysis.contains("适度外向"));

        let empty = analyze_complementarity(&[]);
        assert_eq!(empty.lines().count(), 1);
    }

    #[test]
    fn test_preferences_filter_categories() {
        let answers = vec![
            Answer::new("p005", "user_gentle_communication"),
            Answer::new("p009", choices(&["user_stay_home", "user_relax"])),
            Answer::new("p001", "user_secure_pattern"),
        ];
        let analysis = analyze_preferences(&answers, QuestionBank::partner());

        assert!(analysis.contains("- 你的沟通风格更偏向？：user_gentle_communication"));
        assert!(analysis.contains("- 周末通常怎么度过？：user_stay_home, user_relax"));
        assert!(!analysis.contains("user_secure_pattern"));
    }

    #[test]
    fn test_partner_prompt_structure() {
        let answers = vec![
            Answer::new("p001", "user_anxious_pattern"),
            Answer::new("p007", choices(&["user_rational"])),
            Answer::new("p020", "窗外下着小雨"),
        ];
        let request = partner_prompt(&answers, QuestionBank::partner());

        assert_eq!(request.temperature, PARTNER_TEMPERATURE);
        assert!(request.system.contains("关系心理学家"));
        assert!(request.prompt.contains("### 依恋模式"));
        assert!(request.prompt.contains("### 依恋风格分析\n基于用户在亲密关系中的表现：\n- 表现出焦虑型"));
        assert!(request.prompt.contains("更感性的伴侣"));
        assert!(request.prompt.contains("\"whyPerfectMatch\""));
        assert!(request.prompt.contains("窗外下着小雨"));
    }
}
