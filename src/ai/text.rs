//! Text Providers
//!
//! DeepSeek and OpenAI both speak the OpenAI Chat Completions protocol, so a
//! single client covers the whole text chain:
//! DeepSeek Reasoner → DeepSeek Chat → OpenAI GPT-4o.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::provider::Provider;
use crate::config::{DEEPSEEK_KEY_ENV, OPENAI_KEY_ENV, TextConfig};
use crate::constants::text;
use crate::types::{ErrorClassifier, ProviderError};

/// System + user prompt pair sent to a chat model
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

/// Raw model answer; structured parsing happens in the caller
#[derive(Debug, Clone)]
pub struct TextCompletion {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// OpenAI-compatible chat completion provider
pub struct OpenAiCompatProvider {
    name: &'static str,
    key_env: &'static str,
    /// Never exposed in logs or debug output
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    max_tokens: usize,
    /// Request `response_format: json_object`; the reasoner model rejects it
    json_mode: bool,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("name", &self.name)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiCompatProvider {
    pub fn deepseek_reasoner(
        client: reqwest::Client,
        config: &TextConfig,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            name: "deepseek-reasoner",
            key_env: DEEPSEEK_KEY_ENV,
            api_key,
            base_url: config.deepseek_base_url.clone(),
            model: text::DEEPSEEK_REASONER_MODEL.to_string(),
            max_tokens: config.reasoner_max_tokens,
            json_mode: false,
            client,
        }
    }

    pub fn deepseek_chat(
        client: reqwest::Client,
        config: &TextConfig,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            name: "deepseek-chat",
            key_env: DEEPSEEK_KEY_ENV,
            api_key,
            base_url: config.deepseek_base_url.clone(),
            model: text::DEEPSEEK_CHAT_MODEL.to_string(),
            max_tokens: config.chat_max_tokens,
            json_mode: true,
            client,
        }
    }

    pub fn openai(
        client: reqwest::Client,
        config: &TextConfig,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            name: "openai",
            key_env: OPENAI_KEY_ENV,
            api_key,
            base_url: config.openai_base_url.clone(),
            model: text::OPENAI_MODEL.to_string(),
            max_tokens: config.chat_max_tokens,
            json_mode: true,
            client,
        }
    }

    fn build_request(&self, request: &TextRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: self.max_tokens,
            stream: false,
            response_format: self.json_mode.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Provider<TextRequest, TextCompletion> for OpenAiCompatProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &TextRequest) -> Result<TextCompletion, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::not_configured(self.name, self.key_env))?;

        info!(
            provider = self.name,
            model = %self.model,
            temperature = request.temperature,
            "Requesting chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&self.build_request(request))
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, self.name))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorClassifier::classify_response(response, self.name).await);
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            ProviderError::parse(self.name, format!("invalid completion body: {}", e))
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ProviderError::parse(self.name, "empty completion content"))?;

        let usage = body
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();
        debug!(
            provider = self.name,
            tokens = usage.total(),
            chars = content.chars().count(),
            "Completion received"
        );

        Ok(TextCompletion {
            content,
            model: self.model.clone(),
            usage,
        })
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: usize,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorCategory;
    use httpmock::prelude::*;
    use serde_json::json;

    fn text_config(base: &str) -> TextConfig {
        TextConfig {
            deepseek_base_url: base.to_string(),
            openai_base_url: base.to_string(),
            ..TextConfig::default()
        }
    }

    fn key() -> Option<SecretString> {
        Some(SecretString::from("sk-test".to_string()))
    }

    fn request() -> TextRequest {
        TextRequest {
            system: "你是一位关系心理学专家".to_string(),
            prompt: "用户答案".to_string(),
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn test_chat_completion_success() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_partial(r#"{"model":"deepseek-chat","max_tokens":4000,"response_format":{"type":"json_object"}}"#);
            then.status(200).json_body(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"name\":\"沈念\"}"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 30}
            }));
        });

        let provider = OpenAiCompatProvider::deepseek_chat(
            reqwest::Client::new(),
            &text_config(&server.base_url()),
            key(),
        );
        let completion = provider.generate(&request()).await.unwrap();

        mock.assert();
        assert_eq!(completion.content, "{\"name\":\"沈念\"}");
        assert_eq!(completion.model, "deepseek-chat");
        assert_eq!(completion.usage.total(), 42);
    }

    #[test]
    fn test_token_total_saturates() {
        let usage = TokenUsage {
            input_tokens: u32::MAX,
            output_tokens: 10,
        };
        assert_eq!(usage.total(), u32::MAX);
    }

    #[tokio::test]
    async fn test_reasoner_uses_larger_budget_without_json_mode() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .json_body_partial(r#"{"model":"deepseek-reasoner","max_tokens":8000}"#);
            then.status(200).json_body(json!({
                "choices": [{"message": {"content": "{}"}}]
            }));
        });

        let provider = OpenAiCompatProvider::deepseek_reasoner(
            reqwest::Client::new(),
            &text_config(&server.base_url()),
            key(),
        );
        assert!(provider.build_request(&request()).response_format.is_none());
        provider.generate(&request()).await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn test_http_errors_are_classified() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).body("invalid api key");
        });

        let provider = OpenAiCompatProvider::openai(
            reqwest::Client::new(),
            &text_config(&server.base_url()),
            key(),
        );
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Auth);
        assert_eq!(err.provider, "openai");
        assert_eq!(err.status, Some(401));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(503).body("overloaded");
        });

        let provider = OpenAiCompatProvider::openai(
            reqwest::Client::new(),
            &text_config(&server.base_url()),
            key(),
        );
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after_header() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429)
                .header("retry-after", "7")
                .json_body(json!({"error": {"message": "Rate limit reached", "retry_after": 30}}));
        });

        let provider = OpenAiCompatProvider::openai(
            reqwest::Client::new(),
            &text_config(&server.base_url()),
            key(),
        );
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert_eq!(err.retry_after, Some(std::time::Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back_to_body_field() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(429)
                .json_body(json!({"error": {"message": "Rate limit reached", "retry_after": 3}}));
        });

        let provider = OpenAiCompatProvider::deepseek_chat(
            reqwest::Client::new(),
            &text_config(&server.base_url()),
            key(),
        );
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.retry_after, Some(std::time::Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_empty_content_is_parse_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .json_body(json!({"choices": [{"message": {"content": "  "}}]}));
        });

        let provider = OpenAiCompatProvider::openai(
            reqwest::Client::new(),
            &text_config(&server.base_url()),
            key(),
        );
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::ParseError);
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let provider =
            OpenAiCompatProvider::openai(reqwest::Client::new(), &TextConfig::default(), None);
        assert!(!provider.is_configured());

        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Config);
        assert!(err.message.contains("OPENAI_API_KEY"));
        assert!(!format!("{:?}", provider).contains("sk-"));
    }
}
