use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

const PARTNER_QUESTIONS: &str = include_str!("partner_questions.yaml");

static PARTNER_BANK: LazyLock<QuestionBank> = LazyLock::new(|| {
    let questions: Vec<Question> =
        serde_yaml::from_str(PARTNER_QUESTIONS).expect("embedded partner question bank is valid");
    QuestionBank { questions }
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    SingleChoice,
    MultipleChoice,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Attachment,
    EmotionalNeeds,
    Communication,
    Personality,
    Lifestyle,
    Values,
    Social,
    Decision,
    Stress,
    Fears,
    Security,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Self::Attachment,
        Self::EmotionalNeeds,
        Self::Communication,
        Self::Personality,
        Self::Lifestyle,
        Self::Values,
        Self::Social,
        Self::Decision,
        Self::Stress,
        Self::Fears,
        Self::Security,
    ];

    /// Display label used in prompts and the terminal wizard
    pub fn label(&self) -> &'static str {
        match self {
            Self::Attachment => "依恋模式",
            Self::EmotionalNeeds => "情感模式",
            Self::Communication => "沟通风格",
            Self::Personality => "性格特征",
            Self::Lifestyle => "生活方式",
            Self::Values => "价值观念",
            Self::Social => "社交模式",
            Self::Decision => "决策风格",
            Self::Stress => "压力应对",
            Self::Fears => "关系担忧",
            Self::Security => "安全感",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<QuestionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default = "required_default")]
    pub required: bool,
    pub category: Category,
}

fn required_default() -> bool {
    true
}

impl Question {
    /// Option label for a stored value, falling back to the value itself
    pub fn label_for<'a>(&'a self, value: &'a str) -> &'a str {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
            .unwrap_or(value)
    }
}

/// Ordered questionnaire
#[derive(Debug, Clone, Serialize)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// The built-in partner matching questionnaire (p001-p020)
    pub fn partner() -> &'static QuestionBank {
        &PARTNER_BANK
    }

    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn by_category(&self, category: Category) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.category == category)
            .collect()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Label for the category a question belongs to
    pub fn category_label(&self, question_id: &str) -> Option<&'static str> {
        self.get(question_id).map(|q| q.category.label())
    }
}
