use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use url::{Url, form_urlencoded};

use super::{ImageBatch, ImageRequest};
use crate::ai::provider::Provider;
use crate::constants::image::{MAX_URL_LEN, POLLINATIONS_MODEL};
use crate::types::{ErrorCategory, ProviderError};

const NAME: &str = "pollinations-flux-anime";

/// Keyless backend; the image is rendered when its URL is first fetched
#[derive(Debug, Clone)]
pub struct PollinationsProvider {
    base_url: String,
    model: String,
}

impl PollinationsProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: POLLINATIONS_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Image URL for one prompt; `flux` is the service default and is not sent
    pub fn image_url(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        seed: i64,
    ) -> Result<String, ProviderError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            ProviderError::new(
                ErrorCategory::Config,
                NAME,
                format!("invalid base url '{}': {}", self.base_url, e),
            )
        })?;

        if url.cannot_be_a_base() {
            return Err(ProviderError::new(
                ErrorCategory::Config,
                NAME,
                "base url cannot hold a path",
            ));
        }
        // Reserved delimiters (, : ; and friends) are escaped too, as the
        // service's own clients do
        let encoded = form_urlencoded::byte_serialize(prompt.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        let path = format!("{}/prompt/{}", url.path().trim_end_matches('/'), encoded);
        url.set_path(&path);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("width", &width.to_string())
                .append_pair("height", &height.to_string())
                .append_pair("nologo", "true")
                .append_pair("enhance", "false");
            if self.model != "flux" {
                query.append_pair("model", &self.model);
            }
            query.append_pair("seed", &seed.to_string());
        }

        let url = String::from(url);
        if url.len() > MAX_URL_LEN {
            warn!(
                provider = NAME,
                length = url.len(),
                limit = MAX_URL_LEN,
                "Pollinations URL exceeds recommended length"
            );
        }
        Ok(url)
    }
}

#[async_trait]
impl Provider<ImageRequest, ImageBatch> for PollinationsProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &ImageRequest) -> Result<ImageBatch, ProviderError> {
        let (width, height) = request.aspect_ratio.dimensions();
        let base_seed = Utc::now().timestamp_millis();
        info!(
            provider = NAME,
            model = %self.model,
            count = request.count,
            dimensions = %format!("{}x{}", width, height),
            "Building Pollinations image URLs"
        );

        let images = (0..request.count as usize)
            .map(|i| {
                let prompt = request.scene_prompt(i);
                debug!(provider = NAME, scene = i + 1, chars = prompt.chars().count(), "Scene prompt");
                self.image_url(prompt, width, height, base_seed + i as i64)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ImageBatch {
            images,
            model: NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompt::AspectRatio;
    use crate::constants::image::POLLINATIONS_BASE_URL;

    fn request(prompts: &[&str], count: u8) -> ImageRequest {
        ImageRequest {
            count,
            aspect_ratio: AspectRatio::Tall,
            pollinations_prompts: prompts.iter().map(|s| s.to_string()).collect(),
            flux_prompt: "flux".to_string(),
            sdxl_prompt: "sdxl".to_string(),
            negative_prompt: String::new(),
        }
    }

    #[test]
    fn test_image_url_shape() {
        let provider = PollinationsProvider::new(POLLINATIONS_BASE_URL);
        let url = provider
            .image_url("Pixel art, cozy cafe", 1024, 1824, 42)
            .unwrap();

        assert_eq!(
            url,
            "https://image.pollinations.ai/prompt/Pixel%20art%2C%20cozy%20cafe?width=1024&height=1824&nologo=true&enhance=false&model=turbo&seed=42"
        );
    }

    #[test]
    fn test_flux_model_is_not_sent() {
        let provider = PollinationsProvider::new(POLLINATIONS_BASE_URL).with_model("flux");
        let url = provider.image_url("a", 768, 1024, 1).unwrap();
        assert!(!url.contains("model="));
    }

    #[test]
    fn test_prompt_is_escaped_as_one_segment() {
        let provider = PollinationsProvider::new("https://image.pollinations.ai/");
        let url = provider.image_url("沈念 a/b?c", 1, 1, 1).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let segments: Vec<_> = parsed.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], "prompt");
    }

    #[test]
    fn test_prompt_delimiters_are_escaped() {
        let provider = PollinationsProvider::new(POLLINATIONS_BASE_URL);
        let url = provider
            .image_url("anime, soft light: dusk; 50% rain+fog", 1, 1, 1)
            .unwrap();
        let path = Url::parse(&url).unwrap().path().to_string();

        assert_eq!(
            path,
            "/prompt/anime%2C%20soft%20light%3A%20dusk%3B%2050%25%20rain%2Bfog"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let provider = PollinationsProvider::new("not a url");
        let err = provider.image_url("a", 1, 1, 1).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Config);
    }

    #[tokio::test]
    async fn test_generate_one_url_per_image_with_distinct_seeds() {
        let provider = PollinationsProvider::new(POLLINATIONS_BASE_URL);
        assert!(provider.is_configured());

        let batch = provider
            .generate(&request(&["scene one", "scene two"], 3))
            .await
            .unwrap();

        assert_eq!(batch.model, "pollinations-flux-anime");
        assert_eq!(batch.images.len(), 3);
        assert!(batch.images[0].contains("scene%20one"));
        assert!(batch.images[1].contains("scene%20two"));
        assert!(batch.images[2].contains("scene%20one"));

        let seeds: Vec<&str> = batch
            .images
            .iter()
            .map(|u| u.rsplit("seed=").next().unwrap())
            .collect();
        assert_ne!(seeds[0], seeds[1]);
    }
}
