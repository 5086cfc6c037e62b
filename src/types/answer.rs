use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// A single answer: free text or the values of the selected options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Text(String),
    Choices(Vec<String>),
}

impl AnswerValue {
    /// Blank text and empty selections both count as unanswered
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Choices(choices) => choices.is_empty(),
        }
    }

    /// Render for prompts; selections are comma separated
    pub fn joined(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Choices(choices) => choices.join(", "),
        }
    }

    /// Whether the answer is, or includes, the given option value
    pub fn has_choice(&self, value: &str) -> bool {
        match self {
            Self::Text(text) => text == value,
            Self::Choices(choices) => choices.iter().any(|c| c == value),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Choices(_) => None,
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<String>> for AnswerValue {
    fn from(choices: Vec<String>) -> Self {
        Self::Choices(choices)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub answer: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
}

impl Answer {
    pub fn new(question_id: impl Into<String>, answer: impl Into<AnswerValue>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            answered_at: None,
        }
    }
}

/// Find the answer for a question id
pub fn find_answer<'a>(answers: &'a [Answer], question_id: &str) -> Option<&'a Answer> {
    answers.iter().find(|a| a.question_id == question_id)
}

/// Reject empty payloads, short payloads and entries without a question id
pub fn validate_answers(answers: &[Answer], min: usize) -> Result<(), ValidationError> {
    if answers.is_empty() {
        return Err(ValidationError::field("answers", "no answers provided"));
    }
    if answers.len() < min {
        return Err(ValidationError::field(
            "answers",
            format!("expected at least {} answers, got {}", min, answers.len()),
        ));
    }
    if let Some(pos) = answers.iter().position(|a| a.question_id.trim().is_empty()) {
        return Err(ValidationError::field(
            format!("answers[{}].questionId", pos),
            "must not be empty",
        ));
    }
    Ok(())
}
