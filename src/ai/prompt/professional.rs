//! Big Five "Echo" personality prompts

use super::{PromptBuilder, answers_by_category};
use crate::ai::text::TextRequest;
use crate::constants::text::PERSONALITY_TEMPERATURE;
use crate::interview::QuestionBank;
use crate::types::Answer;

const PROFESSIONAL_SCHEMA: &str = r#"
{
  "name": "中文名", "nickname": "昵称", "age": "25-30", "vibe": "气质", "tagline": "一句话描述",
  "bigFive": {"openness": 7, "conscientiousness": 8, "extraversion": 4, "agreeableness": 7, "neuroticism": 3},
  "lifeDetails": {
    "routine": {"sleepPattern": "", "weekendStyle": [""], "roomTidiness": ""},
    "social": {"energySource": "", "socialMediaStyle": "", "problemSolvingStyle": "", "friendCircleSize": ""},
    "decision": {"planningStyle": "", "taskHandling": "", "travelPrep": ""},
    "emotion": {"stressResponse": "", "copingMethods": [""], "criticismReaction": ""},
    "interests": {"attitudeToNew": "", "hobbyTypes": [""], "curiosityLevel": ""},
    "dailyHabits": {"eating": [""], "shopping": "", "caffeine": true, "petPreference": ""}
  },
  "communication": {
    "speaking": {"volume": "", "pace": "", "responseTime": ""},
    "conflictStyle": "",
    "relationshipPattern": {"idealFrequency": "", "focusOn": "", "helpStyle": ""}
  },
  "personality": {"coreTraits": [""], "strengthsAndWeaknesses": {"strengths": [""], "weaknesses": [""]}},
  "typicalBehaviors": {"morningRoutine": "", "eveningRoutine": "", "weekendActivity": "", "stressedMoment": "", "happyMoment": ""},
  "togetherScenes": {"dailyChat": "", "whenYouSad": "", "whenYouHappy": "", "weekendPlan": ""},
  "whyMatch": {"lifestyleMatch": "", "emotionalMatch": "", "valueMatch": ""},
  "uniqueDetails": {"catchphrase": "", "quirkyHabit": "", "favoriteTime": "", "comfortFood": ""}
}
"#;

pub fn professional_system_prompt() -> String {
    PromptBuilder::new()
        .role(
            "专业的心理学家",
            "擅长基于 Big Five 人格理论（开放性、尽责性、外向性、宜人性、神经质）进行人格分析",
        )
        .principles(
            "输出风格",
            &[
                "真实的人，有具体的生活习惯和行为模式",
                "文艺与生活气息并存，细节具体可感",
                "避免空洞的诗意和抽象表达",
            ],
        )
        .text("必须严格按照 JSON schema 输出，所有字段必须填写，不能省略。")
        .build()
}

/// System and user prompt for the Big Five flow
///
/// Answers to questions outside the bank are still passed on as
/// `id: answer` lines.
pub fn professional_prompt(answers: &[Answer], bank: &QuestionBank) -> TextRequest {
    let unknown = answers
        .iter()
        .filter(|a| bank.get(&a.question_id).is_none())
        .map(|a| format!("{}: {}", a.question_id, a.answer.joined()))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = PromptBuilder::new()
        .text("用户完成了一次基于 Big Five 人格理论的深度访谈。以下是他们的回答：")
        .section("访谈回答", &answers_by_category(answers, bank))
        .section("其他回答", &unknown)
        .text("**请基于这些回答，生成一个与用户契合的 Echo 人格档案。**")
        .principles(
            "分析步骤",
            &[
                "从回答中提取 Big Five 各维度的分数（1-10分）",
                "识别用户的生活方式、习惯、偏好",
                "创造一个与用户互补或相似的 Echo 人格",
            ],
        )
        .schema(PROFESSIONAL_SCHEMA)
        .rules(&[
            "基于实际回答，不要臆造信息",
            "Echo 应该是真实的人，有优点也有小缺点",
            "性别不限，自动匹配用户需求",
        ])
        .build();

    TextRequest {
        system: professional_system_prompt(),
        prompt,
        temperature: PERSONALITY_TEMPERATURE,
    }
}
