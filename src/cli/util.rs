//! CLI Common Utilities
//!
//! Config resolution and JSON file handling shared by the command handlers.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{Config, ConfigLoader};
use crate::studio::Studio;
use crate::types::{Answer, EchoError, EchoPersonality, PartnerProfile, PortraitSubject, Result};

/// Command execution context
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    /// Load configuration, with `config_path` replacing the project file
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(EchoError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                ConfigLoader::load_from(ConfigLoader::global_config_path().as_deref(), path)?
            }
            None => ConfigLoader::load()?,
        };
        Ok(Self { config })
    }

    pub fn studio(&self) -> Result<Studio> {
        Studio::from_config(&self.config)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        EchoError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Pretty JSON to `path`, or stdout when no path is given
pub fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)?;
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Answers file: a bare array or an `{ "answers": [...] }` request body
pub fn read_answers(path: &Path) -> Result<Vec<Answer>> {
    answers_from_value(read_json(path)?)
}

fn answers_from_value(value: Value) -> Result<Vec<Answer>> {
    let list = match value {
        Value::Object(mut map) => map.remove("answers").ok_or_else(|| {
            EchoError::InvalidInput("answers file has no 'answers' field".to_string())
        })?,
        other => other,
    };
    Ok(serde_json::from_value(list)?)
}

/// Profile loaded for portrait generation
#[derive(Debug, Clone)]
pub enum ProfileFile {
    Partner(Box<PartnerProfile>),
    Echo(EchoPersonality),
}

impl ProfileFile {
    /// Accepts a partner profile, an echo personality, or a saved generation
    /// result that wraps either under `partner` / `personality`
    pub fn from_value(value: Value) -> Result<Self> {
        if let Some(partner) = value.get("partner") {
            return Ok(Self::Partner(Box::new(serde_json::from_value(partner.clone())?)));
        }
        if value.get("corePersonality").is_some() {
            return Ok(Self::Partner(Box::new(serde_json::from_value(value)?)));
        }
        let personality = value
            .get("personality")
            .or_else(|| value.get("legacyPersonality"))
            .cloned()
            .unwrap_or(value);
        Ok(Self::Echo(serde_json::from_value(personality)?))
    }

    pub fn read(path: &Path) -> Result<Self> {
        Self::from_value(read_json(path)?)
    }

    pub fn subject(&self) -> PortraitSubject<'_> {
        match self {
            Self::Partner(p) => PortraitSubject::Partner(p),
            Self::Echo(p) => PortraitSubject::Echo(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::partner::tests::sample_partner_json;
    use crate::types::personality::tests::sample_personality;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_answers_from_both_shapes() {
        let bare = json!([{"questionId": "p001", "answer": "user_secure_pattern"}]);
        assert_eq!(answers_from_value(bare).unwrap().len(), 1);

        let wrapped = json!({"answers": [
            {"questionId": "p001", "answer": "a"},
            {"questionId": "p007", "answer": ["x", "y"]}
        ]});
        let answers = answers_from_value(wrapped).unwrap();
        assert_eq!(answers[1].answer.joined(), "x, y");

        assert!(answers_from_value(json!({"other": []})).is_err());
    }

    #[test]
    fn test_profile_file_shapes() {
        let partner = ProfileFile::from_value(sample_partner_json()).unwrap();
        assert!(matches!(partner.subject(), PortraitSubject::Partner(_)));

        let outcome = json!({"partner": sample_partner_json(), "model": "deepseek-chat"});
        assert_eq!(ProfileFile::from_value(outcome).unwrap().subject().name(), "沈念");

        let echo = serde_json::to_value(sample_personality()).unwrap();
        let wrapped = json!({"personality": echo.clone()});
        for value in [echo, wrapped] {
            assert!(matches!(
                ProfileFile::from_value(value).unwrap(),
                ProfileFile::Echo(_)
            ));
        }
    }

    #[test]
    fn test_write_and_read_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/answers.json");
        let answers = vec![Answer::new("p017", "被理解")];

        write_json(Some(&path), &answers).unwrap();
        assert_eq!(read_answers(&path).unwrap(), answers);
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let err = CommandContext::load(Some(Path::new("/nonexistent/echo.toml")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("not found"));
    }
}
