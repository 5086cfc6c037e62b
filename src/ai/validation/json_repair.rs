//! JSON extraction and repair for model output
//!
//! Models asked for JSON still wrap it in fences, prefix it with prose or
//! leave a trailing comma behind. Extraction is tried in order:
//! 1. The whole response as-is
//! 2. The body of a ```json fence
//! 3. The outermost `{ ... }` span
//! 4. Repair of the best candidate (trailing commas, unclosed strings, unbalanced brackets)

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{EchoError, Result};

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```").expect("valid fence regex")
});

/// Extract the first usable JSON value from a model response
pub fn extract_json(content: &str) -> Result<Value> {
    JsonRepairer::new()
        .parse_or_repair(content)
        .map(|(value, _)| value)
}

/// Extract JSON and deserialize it into `T`
pub fn extract_as<T: DeserializeOwned>(content: &str) -> Result<T> {
    let value = extract_json(content)?;
    serde_json::from_value(value)
        .map_err(|e| EchoError::Parse(format!("JSON does not match expected shape: {}", e)))
}

/// JSON repair strategies
#[derive(Debug, Default)]
pub struct JsonRepairer;

impl JsonRepairer {
    pub fn new() -> Self {
        Self
    }

    /// Parse JSON, attempting extraction and repair if the direct parse fails
    ///
    /// Returns (Value, was_repaired)
    pub fn parse_or_repair(&self, raw: &str) -> Result<(Value, bool)> {
        let cleaned = raw.trim().trim_start_matches('\u{feff}').trim();
        if cleaned.is_empty() {
            return Err(EchoError::Parse("empty response".to_string()));
        }

        if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
            return Ok((value, false));
        }

        let fenced = JSON_FENCE
            .captures(cleaned)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim());
        if let Some(body) = fenced
            && let Ok(value) = serde_json::from_str::<Value>(body)
        {
            debug!("JSON extracted from code fence");
            return Ok((value, false));
        }

        let outer = outermost_object(cleaned);
        if let Some(span) = outer
            && let Ok(value) = serde_json::from_str::<Value>(span)
        {
            debug!("JSON extracted from surrounding text");
            return Ok((value, false));
        }

        let candidate = fenced.or(outer).unwrap_or(cleaned);
        let start = candidate.find('{').unwrap_or(0);
        let repaired = self.repair(&candidate[start..]);
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            warn!("Model JSON required repair");
            return Ok((value, true));
        }

        Err(EchoError::Parse(format!(
            "no valid JSON in response: {}...",
            cleaned.chars().take(200).collect::<String>()
        )))
    }

    fn repair(&self, s: &str) -> String {
        let result = fix_trailing_commas(s);
        let result = fix_truncated_strings(&result);
        balance_brackets(&result)
    }
}

/// Span from the first `{` to the last `}`
fn outermost_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    (end > start).then(|| &s[start..=end])
}

/// Drop commas directly before `]` or `}` outside of strings
fn fix_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in chars.iter().enumerate() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            ',' if !in_string => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some(']') | Some('}')) {
                    continue;
                }
            }
            _ => {}
        }
        result.push(ch);
    }

    result
}

/// Close a string cut off by a newline or the end of input
fn fix_truncated_strings(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            result.push(ch);
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '\n' | '\r' if in_string => {
                result.push('"');
                in_string = false;
            }
            _ => {}
        }
        result.push(ch);
    }

    if in_string {
        result.push('"');
    }
    result
}

/// Append closers for every unclosed `[` and `{`, innermost first
fn balance_brackets(s: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for ch in s.chars() {
        if escape {
            escape = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => stack.push('}'),
            '[' if !in_string => stack.push(']'),
            '}' | ']' if !in_string => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut result = s.trim_end().trim_end_matches(',').to_string();
    if in_string {
        result.push('"');
    }
    while let Some(closer) = stack.pop() {
        result.push(closer);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_direct_parse() {
        let (value, repaired) = JsonRepairer::new()
            .parse_or_repair(r#"{"name": "林知夏"}"#)
            .unwrap();
        assert_eq!(value["name"], "林知夏");
        assert!(!repaired);
    }

    #[test]
    fn test_code_fence() {
        let input = "好的，这是结果：\n```json\n{\"key\": \"value\"}\n```\n希望喜欢";
        assert_eq!(extract_json(input).unwrap()["key"], "value");
    }

    #[test]
    fn test_outermost_braces() {
        let input = "Here you go: {\"a\": {\"b\": 1}} Enjoy!";
        assert_eq!(extract_json(input).unwrap()["a"]["b"], 1);
    }

    #[test]
    fn test_trailing_comma_repaired() {
        let input = r#"{"keywords": ["温柔", "靠谱",], "name": "x",}"#;
        let (value, repaired) = JsonRepairer::new().parse_or_repair(input).unwrap();
        assert!(repaired);
        assert_eq!(value["keywords"][1], "靠谱");
    }

    #[test]
    fn test_truncated_output_repaired() {
        let input = r#"{"name": "x", "traits": ["a", "b"#;
        let value = extract_json(input).unwrap();
        assert_eq!(value["traits"][1], "b");
    }

    #[test]
    fn test_commas_inside_strings_untouched() {
        let input = r#"{"text": "a,}", "list": [1,]}"#;
        let value = extract_json(input).unwrap();
        assert_eq!(value["text"], "a,}");
    }

    #[test]
    fn test_no_json_is_parse_error() {
        assert!(matches!(
            extract_json("抱歉，我无法完成这个请求。"),
            Err(EchoError::Parse(_))
        ));
        assert!(matches!(extract_json("   "), Err(EchoError::Parse(_))));
    }

    #[test]
    fn test_extract_as_shape_mismatch() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Named {
            name: String,
        }
        assert!(extract_as::<Named>(r#"{"name": "x"}"#).is_ok());
        assert!(matches!(
            extract_as::<Named>(r#"{"title": "x"}"#),
            Err(EchoError::Parse(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_wrapped_object_is_recovered(
            key in "[a-z]{1,8}",
            val in "[a-zA-Z0-9 ]{0,20}",
            prefix in "[a-zA-Z ]{0,20}",
        ) {
            let body = serde_json::json!({ key.clone(): val.clone() }).to_string();
            let wrapped = format!("{}\n```json\n{}\n```\n", prefix, body);
            let value = extract_json(&wrapped).unwrap();
            prop_assert_eq!(value[&key].as_str(), Some(val.as_str()));
        }
    }
}
