use chrono::{DateTime, Utc};

use super::bank::{Question, QuestionBank};
use crate::types::{Answer, AnswerValue, ValidationError};

/// Wizard state over a question bank
///
/// Navigation never leaves the bank: out-of-range moves are ignored and
/// reported as `false`.
#[derive(Debug, Clone)]
pub struct InterviewSession<'a> {
    bank: &'a QuestionBank,
    current: usize,
    answers: Vec<Answer>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl<'a> InterviewSession<'a> {
    pub fn new(bank: &'a QuestionBank) -> Self {
        Self {
            bank,
            current: 0,
            answers: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
        self.current = 0;
    }

    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.bank.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> bool {
        self.set_current(self.current + 1)
    }

    pub fn previous(&mut self) -> bool {
        match self.current.checked_sub(1) {
            Some(index) => self.set_current(index),
            None => false,
        }
    }

    /// Record an answer, replacing any earlier answer to the same question
    pub fn answer(&mut self, question_id: &str, value: impl Into<AnswerValue>) {
        let answer = Answer {
            question_id: question_id.to_string(),
            answer: value.into(),
            answered_at: Some(Utc::now()),
        };
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == question_id)
        {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn current_question(&self) -> Option<&'a Question> {
        self.bank.questions().get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.bank.len()
    }

    /// Position through the bank as a rounded percentage
    pub fn progress(&self) -> u8 {
        if self.bank.is_empty() {
            return 100;
        }
        (((self.current + 1) as f64 / self.bank.len() as f64) * 100.0).round() as u8
    }

    /// Whether the current question is satisfied
    pub fn can_proceed(&self) -> bool {
        self.current_question()
            .is_none_or(|q| self.is_satisfied(q))
    }

    /// Required questions that still lack a usable answer
    pub fn missing_required(&self) -> Vec<&'a str> {
        self.bank
            .questions()
            .iter()
            .filter(|q| !self.is_satisfied(q))
            .map(|q| q.id.as_str())
            .collect()
    }

    pub fn complete(&mut self) -> Result<(), ValidationError> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(ValidationError::field(
                "answers",
                format!("unanswered required questions: {}", missing.join(", ")),
            ));
        }
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.bank);
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn into_answers(self) -> Vec<Answer> {
        self.answers
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    fn is_satisfied(&self, question: &Question) -> bool {
        !question.required
            || self
                .answer_for(&question.id)
                .is_some_and(|a| !a.answer.is_empty())
    }
}
