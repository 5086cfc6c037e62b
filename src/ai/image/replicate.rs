//! Replicate predictions
//!
//! Both models go through the predictions API with `Prefer: wait`, which
//! usually returns a finished prediction. Anything still running is polled
//! through its `urls.get` link.
//!
//! A batch runs one prediction per image. Retryable failures are retried per
//! prediction so finished images are kept; the chain only sees the error once
//! a single prediction has used up its attempts.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ConstantBuilder, ExponentialBuilder, Retryable};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{ImageBatch, ImageRequest};
use crate::ai::provider::Provider;
use crate::config::{ImageConfig, REPLICATE_KEY_ENV};
use crate::constants::chain::{BASE_DELAY_MS, IMAGE_MAX_ATTEMPTS, MAX_DELAY_MS};
use crate::constants::image::{FLUX_MODEL, FLUX_OUTPUT_QUALITY, SDXL_VERSION};
use crate::constants::network::{REPLICATE_MAX_POLLS, REPLICATE_POLL_INTERVAL_MS};
use crate::types::{ErrorCategory, ErrorClassifier, ProviderError};

/// Retry policy for a single prediction
#[derive(Debug, Clone, Copy)]
pub struct PredictionRetry {
    /// Total tries per prediction, first one included
    pub attempts: u8,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PredictionRetry {
    fn default() -> Self {
        Self {
            attempts: IMAGE_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            max_delay: Duration::from_millis(MAX_DELAY_MS),
        }
    }
}

/// Shared HTTP plumbing for both Replicate models
struct ReplicateClient {
    name: &'static str,
    api_key: Option<SecretString>,
    base_url: String,
    client: reqwest::Client,
    poll_interval: Duration,
    max_polls: usize,
    retry: PredictionRetry,
}

impl ReplicateClient {
    fn new(
        name: &'static str,
        client: reqwest::Client,
        config: &ImageConfig,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            name,
            api_key,
            base_url: config.replicate_base_url.trim_end_matches('/').to_string(),
            client,
            poll_interval: Duration::from_millis(REPLICATE_POLL_INTERVAL_MS),
            max_polls: REPLICATE_MAX_POLLS,
            retry: PredictionRetry::default(),
        }
    }

    fn key(&self) -> Result<&SecretString, ProviderError> {
        self.api_key
            .as_ref()
            .ok_or_else(|| ProviderError::not_configured(self.name, REPLICATE_KEY_ENV))
    }

    /// Create a prediction and wait for its first output URL
    async fn run(&self, path: &str, body: &Value) -> Result<String, ProviderError> {
        let key = self.key()?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(key.expose_secret())
            .header("Prefer", "wait")
            .json(body)
            .send()
            .await
            .map_err(|e| ErrorClassifier::classify_reqwest(&e, self.name))?;

        let prediction = self.read_prediction(response).await?;
        let prediction = match prediction.state() {
            PredictionState::Pending => self.wait_for(prediction).await?,
            _ => prediction,
        };
        self.first_output(prediction)
    }

    async fn read_prediction(&self, response: reqwest::Response) -> Result<Prediction, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ErrorClassifier::classify_response(response, self.name).await);
        }
        response
            .json()
            .await
            .map_err(|e| ProviderError::parse(self.name, format!("invalid prediction body: {}", e)))
    }

    async fn wait_for(&self, prediction: Prediction) -> Result<Prediction, ProviderError> {
        let get_url = prediction
            .urls
            .as_ref()
            .and_then(|u| u.get.clone())
            .ok_or_else(|| ProviderError::parse(self.name, "pending prediction without poll url"))?;
        debug!(provider = self.name, id = ?prediction.id, "Prediction pending, polling");

        let poll = || async {
            let key = self.key().map_err(PollError::Fatal)?;
            let response = self
                .client
                .get(&get_url)
                .bearer_auth(key.expose_secret())
                .send()
                .await
                .map_err(|e| PollError::Fatal(ErrorClassifier::classify_reqwest(&e, self.name)))?;
            let prediction = self.read_prediction(response).await.map_err(PollError::Fatal)?;
            match prediction.state() {
                PredictionState::Pending => Err(PollError::Pending(prediction.status)),
                _ => Ok(prediction),
            }
        };

        poll.retry(
            ConstantBuilder::default()
                .with_delay(self.poll_interval)
                .with_max_times(self.max_polls),
        )
        .when(|e| matches!(e, PollError::Pending(_)))
        .await
        .map_err(|e| match e {
            PollError::Fatal(err) => err,
            PollError::Pending(status) => {
                warn!(provider = self.name, %status, "Prediction did not finish in time");
                ProviderError::new(
                    ErrorCategory::Network,
                    self.name,
                    format!("prediction still {} after {} polls", status, self.max_polls),
                )
            }
        })
    }

    fn first_output(&self, prediction: Prediction) -> Result<String, ProviderError> {
        if prediction.state() == PredictionState::Failed {
            let reason = prediction
                .error
                .map(|e| match e {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| prediction.status.clone());
            return Err(ErrorClassifier::classify(
                &format!("prediction failed: {}", reason),
                self.name,
            ));
        }

        let output = match prediction.output {
            Some(Value::String(url)) => Some(url),
            Some(Value::Array(items)) => items.into_iter().find_map(|v| match v {
                Value::String(url) => Some(url),
                _ => None,
            }),
            _ => None,
        };
        output
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ProviderError::parse(self.name, "prediction returned no output"))
    }

    /// `run` with exponential backoff on retryable failures
    async fn run_retried(&self, path: &str, body: &Value) -> Result<String, ProviderError> {
        let retries = usize::from(self.retry.attempts.max(1) - 1);
        (|| self.run(path, body))
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(self.retry.base_delay)
                    .with_max_delay(self.retry.max_delay)
                    .with_max_times(retries)
                    .with_jitter(),
            )
            .when(|e: &ProviderError| e.category.is_retryable())
            .notify(|e: &ProviderError, delay: Duration| {
                warn!(
                    provider = self.name,
                    category = %e.category,
                    delay_ms = delay.as_millis() as u64,
                    "Prediction failed, retrying"
                );
            })
            .await
    }

    /// One prediction per requested image
    async fn run_many(&self, path: &str, body: &Value, count: u8) -> Result<Vec<String>, ProviderError> {
        let mut images = Vec::with_capacity(count as usize);
        for i in 0..count {
            images.push(self.run_retried(path, body).await?);
            debug!(provider = self.name, image = i + 1, of = count, "Prediction finished");
        }
        Ok(images)
    }
}

enum PollError {
    Pending(String),
    Fatal(ProviderError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PredictionState {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: Option<String>,
    #[serde(default)]
    status: String,
    output: Option<Value>,
    error: Option<Value>,
    urls: Option<PredictionUrls>,
}

impl Prediction {
    fn state(&self) -> PredictionState {
        match self.status.as_str() {
            "succeeded" => PredictionState::Succeeded,
            "failed" | "canceled" => PredictionState::Failed,
            _ => PredictionState::Pending,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

// =============================================================================
// Flux
// =============================================================================

pub struct ReplicateFluxProvider {
    inner: ReplicateClient,
}

impl ReplicateFluxProvider {
    pub fn new(client: reqwest::Client, config: &ImageConfig, api_key: Option<SecretString>) -> Self {
        Self {
            inner: ReplicateClient::new("replicate-flux", client, config, api_key),
        }
    }

    pub fn with_retry(mut self, retry: PredictionRetry) -> Self {
        self.inner.retry = retry;
        self
    }

    #[cfg(test)]
    fn with_polling(mut self, interval: Duration, max_polls: usize) -> Self {
        self.inner.poll_interval = interval;
        self.inner.max_polls = max_polls;
        self
    }
}

#[async_trait]
impl Provider<ImageRequest, ImageBatch> for ReplicateFluxProvider {
    fn name(&self) -> &str {
        self.inner.name
    }

    fn model(&self) -> &str {
        FLUX_MODEL
    }

    fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ImageBatch, ProviderError> {
        info!(
            provider = self.inner.name,
            model = FLUX_MODEL,
            count = request.count,
            aspect_ratio = %request.aspect_ratio,
            "Running Replicate Flux"
        );
        let body = json!({
            "input": {
                "prompt": request.flux_prompt,
                "aspect_ratio": request.aspect_ratio.as_str(),
                "output_format": "png",
                "output_quality": FLUX_OUTPUT_QUALITY,
                "num_outputs": 1,
            }
        });
        let path = format!("/models/{}/predictions", FLUX_MODEL);
        let images = self.inner.run_many(&path, &body, request.count).await?;

        Ok(ImageBatch {
            images,
            model: self.inner.name.to_string(),
        })
    }
}

// =============================================================================
// SDXL
// =============================================================================

pub struct ReplicateSdxlProvider {
    inner: ReplicateClient,
}

impl ReplicateSdxlProvider {
    pub fn new(client: reqwest::Client, config: &ImageConfig, api_key: Option<SecretString>) -> Self {
        Self {
            inner: ReplicateClient::new("replicate-sdxl", client, config, api_key),
        }
    }

    pub fn with_retry(mut self, retry: PredictionRetry) -> Self {
        self.inner.retry = retry;
        self
    }
}

#[async_trait]
impl Provider<ImageRequest, ImageBatch> for ReplicateSdxlProvider {
    fn name(&self) -> &str {
        self.inner.name
    }

    fn model(&self) -> &str {
        "stability-ai/sdxl"
    }

    fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ImageBatch, ProviderError> {
        let (width, height) = request.aspect_ratio.dimensions();
        info!(
            provider = self.inner.name,
            count = request.count,
            width,
            height,
            "Running Replicate SDXL"
        );
        let body = json!({
            "version": SDXL_VERSION,
            "input": {
                "prompt": request.sdxl_prompt,
                "width": width,
                "height": height,
                "num_outputs": 1,
            }
        });
        let images = self
            .inner
            .run_many("/predictions", &body, request.count)
            .await?;

        Ok(ImageBatch {
            images,
            model: self.inner.name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompt::AspectRatio;
    use httpmock::prelude::*;

    fn config(base: &str) -> ImageConfig {
        ImageConfig {
            replicate_base_url: base.to_string(),
            ..ImageConfig::default()
        }
    }

    fn key() -> Option<SecretString> {
        Some(SecretString::from("r8-test".to_string()))
    }

    fn quick_retry(attempts: u8) -> PredictionRetry {
        PredictionRetry {
            attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn request(count: u8) -> ImageRequest {
        ImageRequest {
            count,
            aspect_ratio: AspectRatio::Portrait,
            pollinations_prompts: vec![],
            flux_prompt: "flux portrait".to_string(),
            sdxl_prompt: "sdxl portrait".to_string(),
            negative_prompt: String::new(),
        }
    }

    #[tokio::test]
    async fn test_flux_runs_one_prediction_per_image() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/models/black-forest-labs/flux-1.1-pro/predictions")
                .header("authorization", "Bearer r8-test")
                .header("prefer", "wait")
                .json_body_partial(
                    r#"{"input":{"prompt":"flux portrait","aspect_ratio":"3:4","output_format":"png","output_quality":90,"num_outputs":1}}"#,
                );
            then.status(201).json_body(serde_json::json!({
                "id": "p1",
                "status": "succeeded",
                "output": "https://replicate.delivery/flux.png"
            }));
        });

        let provider = ReplicateFluxProvider::new(reqwest::Client::new(), &config(&server.base_url()), key());
        let batch = provider.generate(&request(2)).await.unwrap();

        mock.assert_hits(2);
        assert_eq!(batch.model, "replicate-flux");
        assert_eq!(batch.images, vec!["https://replicate.delivery/flux.png"; 2]);
    }

    #[tokio::test]
    async fn test_sdxl_uses_version_and_dimensions() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/predictions")
                .json_body_partial(format!(
                    r#"{{"version":"{}","input":{{"prompt":"sdxl portrait","width":768,"height":1024,"num_outputs":1}}}}"#,
                    SDXL_VERSION
                ));
            then.status(201).json_body(serde_json::json!({
                "status": "succeeded",
                "output": ["https://replicate.delivery/a.png", "https://replicate.delivery/b.png"]
            }));
        });

        let provider = ReplicateSdxlProvider::new(reqwest::Client::new(), &config(&server.base_url()), key());
        let batch = provider.generate(&request(1)).await.unwrap();

        mock.assert();
        assert_eq!(batch.model, "replicate-sdxl");
        assert_eq!(batch.images, vec!["https://replicate.delivery/a.png"]);
    }

    #[tokio::test]
    async fn test_pending_prediction_is_polled() {
        let server = MockServer::start_async().await;
        let poll_url = server.url("/predictions/p9");
        server.mock(|when, then| {
            when.method(POST).path("/models/black-forest-labs/flux-1.1-pro/predictions");
            then.status(201).json_body(serde_json::json!({
                "id": "p9",
                "status": "processing",
                "urls": {"get": poll_url}
            }));
        });
        let poll = server.mock(|when, then| {
            when.method(GET).path("/predictions/p9");
            then.status(200).json_body(serde_json::json!({
                "id": "p9",
                "status": "succeeded",
                "output": ["https://replicate.delivery/done.png"]
            }));
        });

        let provider = ReplicateFluxProvider::new(reqwest::Client::new(), &config(&server.base_url()), key())
            .with_polling(Duration::from_millis(1), 3);
        let batch = provider.generate(&request(1)).await.unwrap();

        poll.assert();
        assert_eq!(batch.images, vec!["https://replicate.delivery/done.png"]);
    }

    #[tokio::test]
    async fn test_prediction_that_never_finishes_is_network_error() {
        let server = MockServer::start_async().await;
        let poll_url = server.url("/predictions/slow");
        server.mock(|when, then| {
            when.method(POST);
            then.status(201).json_body(serde_json::json!({
                "status": "starting",
                "urls": {"get": poll_url}
            }));
        });
        let poll = server.mock(|when, then| {
            when.method(GET).path("/predictions/slow");
            then.status(200).json_body(serde_json::json!({"status": "processing"}));
        });

        let provider = ReplicateFluxProvider::new(reqwest::Client::new(), &config(&server.base_url()), key())
            .with_polling(Duration::from_millis(1), 2)
            .with_retry(quick_retry(1));
        let err = provider.generate(&request(1)).await.unwrap_err();

        assert_eq!(poll.hits(), 3);
        assert_eq!(err.category, ErrorCategory::Network);
        assert!(err.message.contains("processing"));
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_finished_images() {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(POST).json_body_partial(r#"{"input":{"prompt":"first"}}"#);
            then.status(201).json_body(serde_json::json!({
                "status": "succeeded",
                "output": "https://replicate.delivery/1.png"
            }));
        });
        let flaky = server.mock(|when, then| {
            when.method(POST).json_body_partial(r#"{"input":{"prompt":"second"}}"#);
            then.status(503).body("overloaded");
        });

        let provider = ReplicateFluxProvider::new(reqwest::Client::new(), &config(&server.base_url()), key())
            .with_retry(quick_retry(3));
        let client = &provider.inner;

        let kept = client
            .run_retried("/predictions", &serde_json::json!({"input": {"prompt": "first"}}))
            .await
            .unwrap();
        let err = client
            .run_retried("/predictions", &serde_json::json!({"input": {"prompt": "second"}}))
            .await
            .unwrap_err();

        assert_eq!(kept, "https://replicate.delivery/1.png");
        first.assert_hits(1);
        flaky.assert_hits(3);
        assert_eq!(err.category, ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_batch_retries_only_the_failing_prediction() {
        let server = MockServer::start_async().await;
        let mut outage = server.mock(|when, then| {
            when.method(POST).path("/predictions");
            then.status(503).body("overloaded");
        });

        let provider = ReplicateSdxlProvider::new(reqwest::Client::new(), &config(&server.base_url()), key())
            .with_retry(quick_retry(2));
        let err = provider.generate(&request(2)).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Transient);
        outage.assert_hits(2);
        outage.delete();

        let ok = server.mock(|when, then| {
            when.method(POST).path("/predictions");
            then.status(201).json_body(serde_json::json!({
                "status": "succeeded",
                "output": ["https://replicate.delivery/x.png"]
            }));
        });
        let batch = provider.generate(&request(2)).await.unwrap();
        ok.assert_hits(2);
        assert_eq!(batch.images.len(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried_per_prediction() {
        let server = MockServer::start_async().await;
        let denied = server.mock(|when, then| {
            when.method(POST);
            then.status(403).body("forbidden");
        });

        let provider = ReplicateFluxProvider::new(reqwest::Client::new(), &config(&server.base_url()), key())
            .with_retry(quick_retry(3));
        let err = provider.generate(&request(2)).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Auth);
        denied.assert_hits(1);
    }

    #[tokio::test]
    async fn test_throttle_uses_retry_after_header() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST);
            then.status(429)
                .header("Retry-After", "4")
                .json_body(serde_json::json!({
                    "detail": "Request was throttled. Expected available in 5 seconds."
                }));
        });

        let provider = ReplicateFluxProvider::new(reqwest::Client::new(), &config(&server.base_url()), key())
            .with_retry(quick_retry(1));
        let err = provider.generate(&request(1)).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::RateLimit);
        assert_eq!(err.retry_after, Some(Duration::from_secs(4)));
    }

    #[tokio::test]
    async fn test_failed_prediction_is_classified() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST);
            then.status(201).json_body(serde_json::json!({
                "status": "failed",
                "error": "NSFW content detected"
            }));
        });

        let provider = ReplicateSdxlProvider::new(reqwest::Client::new(), &config(&server.base_url()), key())
            .with_retry(quick_retry(1));
        let err = provider.generate(&request(1)).await.unwrap_err();
        assert!(err.message.contains("NSFW content detected"));
        assert_eq!(err.provider, "replicate-sdxl");
    }

    #[tokio::test]
    async fn test_auth_and_missing_key() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST);
            then.status(401).body("Unauthenticated");
        });

        let provider = ReplicateFluxProvider::new(reqwest::Client::new(), &config(&server.base_url()), key());
        let err = provider.generate(&request(1)).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Auth);

        let unconfigured = ReplicateSdxlProvider::new(reqwest::Client::new(), &config(&server.base_url()), None);
        assert!(!unconfigured.is_configured());
        let err = unconfigured.generate(&request(1)).await.unwrap_err();
        assert_eq!(err.category, ErrorCategory::Config);
        assert!(err.message.contains("REPLICATE_API_TOKEN"));
    }
}
