pub mod answer;
pub mod error;
pub mod partner;
pub mod personality;
pub mod professional;

pub use answer::{Answer, AnswerValue, find_answer, validate_answers};
pub use error::{
    EchoError, ErrorCategory, ErrorClassifier, ErrorCode, ProviderError, ProviderFailure, Result,
    ValidationError,
};
pub use partner::PartnerProfile;
pub use personality::EchoPersonality;
pub use professional::{BigFiveScores, ProfessionalProfile};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accept a string, number or bool where a string is expected
///
/// Models regularly answer `"age": 26` when asked for `"age": "26"`.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Profile that portraits are generated for
#[derive(Debug, Clone, Copy)]
pub enum PortraitSubject<'a> {
    Partner(&'a PartnerProfile),
    Echo(&'a EchoPersonality),
}

impl PortraitSubject<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Partner(p) => &p.name,
            Self::Echo(p) => &p.name,
        }
    }
}
