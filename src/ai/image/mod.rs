//! Image Providers
//!
//! Portrait backends, in chain order:
//!
//! 1. Pollinations (keyless, URL only)
//! 2. Gemini Imagen
//! 3. Replicate Flux
//! 4. Replicate SDXL
//!
//! Every backend receives the same [`ImageRequest`] and picks the prompt it
//! was written for.

mod gemini;
mod pollinations;
mod replicate;

pub use gemini::GeminiImagenProvider;
pub use pollinations::PollinationsProvider;
pub use replicate::{PredictionRetry, ReplicateFluxProvider, ReplicateSdxlProvider};

use serde::Serialize;

use crate::ai::prompt::{
    AspectRatio, NEGATIVE_PROMPT, flux_prompt, pollinations_scene_prompt, sdxl_prompt,
};
use crate::types::PortraitSubject;

/// One portrait batch with a prompt per backend
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub count: u8,
    pub aspect_ratio: AspectRatio,
    /// One scene per image index
    pub pollinations_prompts: Vec<String>,
    pub flux_prompt: String,
    pub sdxl_prompt: String,
    pub negative_prompt: String,
}

impl ImageRequest {
    pub fn for_subject(subject: PortraitSubject<'_>, count: u8, aspect_ratio: AspectRatio) -> Self {
        Self {
            count,
            aspect_ratio,
            pollinations_prompts: (0..count as usize)
                .map(|i| pollinations_scene_prompt(subject, i))
                .collect(),
            flux_prompt: flux_prompt(subject),
            sdxl_prompt: sdxl_prompt(subject),
            negative_prompt: NEGATIVE_PROMPT.to_string(),
        }
    }

    /// Scene prompt for image `index`, falling back to the Flux prompt
    pub fn scene_prompt(&self, index: usize) -> &str {
        if self.pollinations_prompts.is_empty() {
            return &self.flux_prompt;
        }
        &self.pollinations_prompts[index % self.pollinations_prompts.len()]
    }
}

/// Images from a single backend: URLs or `data:` URIs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBatch {
    pub images: Vec<String>,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::partner::tests::sample_partner;

    #[test]
    fn test_request_for_partner() {
        let partner = sample_partner();
        let request =
            ImageRequest::for_subject(PortraitSubject::Partner(&partner), 3, AspectRatio::Tall);

        assert_eq!(request.pollinations_prompts.len(), 3);
        assert_ne!(request.pollinations_prompts[0], request.pollinations_prompts[1]);
        assert!(request.flux_prompt.contains("沈念"));
        assert!(request.sdxl_prompt.starts_with("Portrait of 沈念"));
        assert_eq!(request.negative_prompt, NEGATIVE_PROMPT);
        assert_eq!(request.scene_prompt(4), request.pollinations_prompts[1]);
    }

    #[test]
    fn test_scene_prompt_without_scenes() {
        let partner = sample_partner();
        let mut request =
            ImageRequest::for_subject(PortraitSubject::Partner(&partner), 1, AspectRatio::Square);
        request.pollinations_prompts.clear();
        assert_eq!(request.scene_prompt(0), request.flux_prompt);
    }
}
