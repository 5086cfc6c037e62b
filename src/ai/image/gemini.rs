use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ImageBatch, ImageRequest};
use crate::ai::provider::Provider;
use crate::config::{GEMINI_KEY_ENV, ImageConfig};
use crate::types::{ErrorClassifier, ProviderError};

const NAME: &str = "gemini-imagen";

/// Gemini `generateContent` with an Imagen model; images come back inline
pub struct GeminiImagenProvider {
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiImagenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiImagenProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiImagenProvider {
    pub fn new(client: reqwest::Client, config: &ImageConfig, api_key: Option<SecretString>) -> Self {
        Self {
            api_key,
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            client,
        }
    }

    fn full_prompt(request: &ImageRequest) -> String {
        if request.negative_prompt.is_empty() {
            request.flux_prompt.clone()
        } else {
            format!(
                "{}\n\nNegative prompt: {}",
                request.flux_prompt, request.negative_prompt
            )
        }
    }
}

#[async_trait]
impl Provider<ImageRequest, ImageBatch> for GeminiImagenProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ImageBatch, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::not_configured(NAME, GEMINI_KEY_ENV))?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: Self::full_prompt(request),
                }],
            }],
            generation_config: GenerationConfig {
                candidate_count: request.count,
            },
        };

        info!(
            provider = NAME,
            model = %self.model,
            count = request.count,
            aspect_ratio = %request.aspect_ratio,
            "Requesting Imagen generation"
        );

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e.without_url(), NAME))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ErrorClassifier::classify_response(response, NAME).await);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::parse(NAME, format!("invalid response body: {}", e.without_url())))?;

        let images = collect_inline_images(body)?;
        debug!(
            provider = NAME,
            images = images.len(),
            kb = images.iter().map(|i| i.len() / 1024).sum::<usize>(),
            "Imagen images decoded"
        );

        Ok(ImageBatch {
            images,
            model: NAME.to_string(),
        })
    }
}

/// Inline parts as `data:` URIs; payloads that are not base64 are rejected
fn collect_inline_images(body: GenerateContentResponse) -> Result<Vec<String>, ProviderError> {
    let mut images = Vec::new();

    for part in body
        .candidates
        .into_iter()
        .flat_map(|c| c.content.map(|c| c.parts).unwrap_or_default())
    {
        let Some(inline) = part.inline_data.filter(|d| !d.data.is_empty()) else {
            continue;
        };
        STANDARD
            .decode(&inline.data)
            .map_err(|e| ProviderError::parse(NAME, format!("inline image is not base64: {}", e)))?;

        let mime = inline.mime_type.unwrap_or_else(|| "image/png".to_string());
        images.push(format!("data:{};base64,{}", mime, inline.data));
    }

    if images.is_empty() {
        return Err(ProviderError::parse(NAME, "no images in response"));
    }
    Ok(images)
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    candidate_count: u8,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompt::AspectRatio;
    use crate::types::ErrorCategory;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(base: &str, key: Option<&str>) -> GeminiImagenProvider {
        let config = ImageConfig {
            gemini_base_url: base.to_string(),
            ..ImageConfig::default()
        };
        GeminiImagenProvider::new(
            reqwest::Client::new(),
            &config,
            key.map(|k| SecretString::from(k.to_string())),
        )
    }

    fn request() -> ImageRequest {
        ImageRequest {
            count: 2,
            aspect_ratio: AspectRatio::Tall,
            pollinations_prompts: vec![],
            flux_prompt: "Portrait of 沈念".to_string(),
            sdxl_prompt: String::new(),
            negative_prompt: "blurry".to_string(),
        }
    }

    #[tokio::test]
    async fn test_inline_images_become_data_uris() {
        let server = MockServer::start_async().await;
        let model = ImageConfig::default().gemini_model;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path(format!("/models/{}:generateContent", model))
                .query_param("key", "gm-test")
                .json_body_partial(
                    r#"{"contents":[{"role":"user","parts":[{"text":"Portrait of 沈念\n\nNegative prompt: blurry"}]}],"generationConfig":{"candidateCount":2}}"#,
                );
            then.status(200).json_body(json!({
                "candidates": [
                    {"content": {"parts": [{"inlineData": {"mimeType": "image/jpeg", "data": "aGVsbG8="}}]}},
                    {"content": {"parts": [{"text": "caption"}, {"inlineData": {"data": "d29ybGQ="}}]}}
                ]
            }));
        });

        let batch = provider(&server.base_url(), Some("gm-test"))
            .generate(&request())
            .await
            .unwrap();

        mock.assert();
        assert_eq!(batch.model, "gemini-imagen");
        assert_eq!(
            batch.images,
            vec![
                "data:image/jpeg;base64,aGVsbG8=".to_string(),
                "data:image/png;base64,d29ybGQ=".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_no_images_is_parse_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST);
            then.status(200)
                .json_body(json!({"candidates": [{"content": {"parts": [{"text": "sorry"}]}}]}));
        });

        let err = provider(&server.base_url(), Some("gm-test"))
            .generate(&request())
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::ParseError);
    }

    #[tokio::test]
    async fn test_invalid_base64_is_parse_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({
                "candidates": [{"content": {"parts": [{"inlineData": {"data": "not base64!!"}}]}}]
            }));
        });

        let err = provider(&server.base_url(), Some("gm-test"))
            .generate(&request())
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::ParseError);
        assert!(err.message.contains("base64"));
    }

    #[tokio::test]
    async fn test_quota_exhausted_is_rate_limit() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST);
            then.status(429).body("RESOURCE_EXHAUSTED");
        });

        let err = provider(&server.base_url(), Some("gm-test"))
            .generate(&request())
            .await
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert!(!err.message.contains("gm-test"));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = provider("http://127.0.0.1:9", None);
        assert!(!provider.is_configured());
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Config);
        assert!(err.message.contains("GOOGLE_GEMINI_API_KEY"));
    }
}
