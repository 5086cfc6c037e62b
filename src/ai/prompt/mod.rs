//! Prompt Builder System
//!
//! Every text prompt is assembled from the same sections so both flows read
//! alike to the model: role, principles, the user's answers grouped by
//! category, derived analysis, the output schema and closing rules.
//!
//! ## Modules
//!
//! - `partner`: Ideal partner synthesis from the partner questionnaire
//! - `professional`: Big Five "Echo" personality synthesis
//! - `image`: Per-provider portrait prompts and aspect ratios

pub mod image;
pub mod partner;
pub mod professional;

pub use image::{
    AspectRatio, NEGATIVE_PROMPT, flux_prompt, infer_age_group, pollinations_scene_prompt,
    sdxl_prompt, story_scenes,
};
pub use partner::{partner_prompt, partner_system_prompt};
pub use professional::{professional_prompt, professional_system_prompt};

use crate::interview::{Category, QuestionBank};
use crate::types::Answer;

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Who the model is and what it is asked to do
    Role { expertise: String, task: String },
    /// Titled bullet list
    Principles { title: String, items: Vec<String> },
    /// Raw text with an optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Expected JSON output shape
    Schema(String),
    /// Numbered closing rules
    Rules(Vec<String>),
    Custom(String),
}

/// Builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn principles(mut self, title: &str, items: &[&str]) -> Self {
        self.sections.push(PromptSection::Principles {
            title: title.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Text section with a header; empty content is dropped
    pub fn section(mut self, header: &str, content: &str) -> Self {
        if !content.trim().is_empty() {
            self.sections.push(PromptSection::Text {
                header: Some(header.to_string()),
                content: content.to_string(),
            });
        }
        self
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.sections.push(PromptSection::Schema(schema.to_string()));
        self
    }

    pub fn rules(mut self, rules: &[&str]) -> Self {
        self.sections.push(PromptSection::Rules(
            rules.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn custom(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Custom(content.to_string()));
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str(&format!("你是一位{}，{}。\n\n", expertise, task));
                }
                PromptSection::Principles { title, items } => {
                    prompt.push_str(&format!("**{}**\n", title));
                    for item in items {
                        prompt.push_str(&format!("- {}\n", item));
                    }
                    prompt.push('\n');
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("## {}\n", h));
                    }
                    prompt.push_str(content.trim_end());
                    prompt.push_str("\n\n");
                }
                PromptSection::Schema(schema) => {
                    prompt.push_str("**输出 JSON 格式：**\n\n```json\n");
                    prompt.push_str(schema.trim());
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::Rules(rules) => {
                    prompt.push_str("**重要提示：**\n");
                    for (i, rule) in rules.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, rule));
                    }
                    prompt.push('\n');
                }
                PromptSection::Custom(content) => {
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Answers rendered as `### label` blocks of `question → answer` lines
///
/// Categories appear in the order they are first answered. Answers to
/// question ids missing from the bank are skipped.
pub(crate) fn answers_by_category(answers: &[Answer], bank: &QuestionBank) -> String {
    let mut groups: Vec<(Category, Vec<String>)> = Vec::new();

    for answer in answers {
        let Some(question) = bank.get(&answer.question_id) else {
            continue;
        };
        let line = format!("{} → {}", question.text, answer.answer.joined());
        match groups.iter_mut().find(|(c, _)| *c == question.category) {
            Some((_, lines)) => lines.push(line),
            None => groups.push((question.category, vec![line])),
        }
    }

    groups
        .into_iter()
        .map(|(category, lines)| format!("### {}\n{}", category.label(), lines.join("\n")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_render_in_order() {
        let prompt = PromptBuilder::new()
            .role("关系心理学家", "擅长伴侣匹配分析")
            .principles("匹配原则", &["依恋风格匹配", "互补性平衡"])
            .section("用户访谈回答", "### 依恋模式\nq → a")
            .schema(r#"{"name": "string"}"#)
            .rules(&["基于实际回答", "避免过度理想化"])
            .build();

        assert!(prompt.starts_with("你是一位关系心理学家，擅长伴侣匹配分析。"));
        assert!(prompt.contains("**匹配原则**\n- 依恋风格匹配\n- 互补性平衡"));
        assert!(prompt.contains("## 用户访谈回答\n### 依恋模式"));
        assert!(prompt.contains("```json\n{\"name\": \"string\"}\n```"));
        assert!(prompt.ends_with("2. 避免过度理想化"));

        let role = prompt.find("你是一位").unwrap();
        let schema = prompt.find("```json").unwrap();
        assert!(role < schema);
    }

    #[test]
    fn test_empty_section_is_dropped() {
        let prompt = PromptBuilder::new()
            .section("空白", "   ")
            .text("正文")
            .build();
        assert!(!prompt.contains("空白"));
        assert_eq!(prompt, "正文");
    }

    #[test]
    fn test_answers_grouped_by_first_seen_category() {
        let answers = vec![
            Answer::new("p008", "user_night_owl"),
            Answer::new("p001", "user_secure_pattern"),
            Answer::new("p020", "在家看书"),
            Answer::new("x999", "ignored"),
        ];
        let summary = answers_by_category(&answers, QuestionBank::partner());

        let lifestyle = summary.find("### 生活方式").unwrap();
        let attachment = summary.find("### 依恋模式").unwrap();
        assert!(lifestyle < attachment);
        assert!(summary.contains("你的日常作息是？ → user_night_owl\n你理想中的周末下午是什么样的？ → 在家看书"));
        assert!(!summary.contains("ignored"));
    }
}
