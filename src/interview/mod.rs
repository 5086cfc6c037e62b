//! Personality interview
//!
//! The embedded partner questionnaire and the wizard state that walks a user
//! through it. Answers themselves live in [`crate::types::answer`] so the API
//! and the prompts can share them.

mod bank;
mod session;

pub use bank::{Category, InputType, Question, QuestionBank, QuestionOption};
pub use session::InterviewSession;
