//! Generation Service
//!
//! [`Studio`] owns the text chain and the image chain and turns interview
//! answers into profiles and profiles into portraits.
//!
//! ```text
//! answers ─▶ prompt ─▶ text chain ─▶ JSON ─▶ validated profile ─▶ legacy personality
//!                                                  │
//! profile ─▶ per-backend prompts ─▶ image chain ─▶ images + used model
//! ```

mod store;

pub use store::{EchoStore, GenerationState, GenerationStatus, SaveEchoRequest, SavedEcho};

use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::ai::image::{
    GeminiImagenProvider, ImageBatch, ImageRequest, PollinationsProvider, PredictionRetry,
    ReplicateFluxProvider, ReplicateSdxlProvider,
};
use crate::ai::prompt::{AspectRatio, partner_prompt, professional_prompt};
use crate::ai::provider::{ChainConfig, ProviderChain, ProviderChainBuilder, ProviderStatus};
use crate::ai::text::{OpenAiCompatProvider, TextCompletion, TextRequest};
use crate::ai::timeout::{TimeoutConfig, with_timeout};
use crate::ai::validation::parse_validated;
use crate::ai::http_client;
use crate::config::Config;
use crate::constants::{image as image_constants, interview, text as text_constants};
use crate::interview::QuestionBank;
use crate::types::{
    Answer, EchoError, EchoPersonality, PartnerProfile, PortraitSubject, ProfessionalProfile,
    Result, ValidationError, validate_answers,
};

pub type TextChain = ProviderChain<TextRequest, TextCompletion>;
pub type ImageChain = ProviderChain<ImageRequest, ImageBatch>;

/// Partner synthesis result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerOutcome {
    pub partner: PartnerProfile,
    pub legacy_personality: EchoPersonality,
    #[serde(rename = "generationTime")]
    pub generation_time_ms: u64,
    /// Text provider that served the profile
    pub model: String,
}

/// Echo personality synthesis result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityOutcome {
    pub personality: EchoPersonality,
    pub profile: ProfessionalProfile,
    #[serde(rename = "generationTime")]
    pub generation_time_ms: u64,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOutcome {
    pub images: Vec<String>,
    pub used_model: String,
    #[serde(rename = "generationTime")]
    pub generation_time_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvidersReport {
    pub text: Vec<ProviderStatus>,
    pub image: Vec<ProviderStatus>,
}

pub struct Studio {
    text: TextChain,
    images: ImageChain,
    bank: &'static QuestionBank,
    timeouts: TimeoutConfig,
    partner_temperature: f32,
    default_count: u8,
    default_aspect_ratio: AspectRatio,
}

impl Studio {
    /// Build both chains from configuration
    ///
    /// Chain order is fixed; attempt budgets come from `[retry]`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeouts = TimeoutConfig::from_config(config);
        let chain_config = ChainConfig::from_retry(&config.retry);
        let retry = &config.retry;
        let keys = &config.keys;

        let text_client = http_client(timeouts.text_request, timeouts.connection)?;
        let text = ProviderChainBuilder::new()
            .with_config(chain_config.clone())
            .add_with_attempts(
                OpenAiCompatProvider::deepseek_reasoner(
                    text_client.clone(),
                    &config.text,
                    keys.deepseek_secret(),
                ),
                retry.text_max_attempts,
            )
            .add_with_attempts(
                OpenAiCompatProvider::deepseek_chat(
                    text_client.clone(),
                    &config.text,
                    keys.deepseek_secret(),
                ),
                retry.text_max_attempts,
            )
            .add_with_attempts(
                OpenAiCompatProvider::openai(text_client, &config.text, keys.openai_secret()),
                retry.text_max_attempts,
            )
            .build();

        // Replicate retries inside each prediction so finished images survive;
        // the chain gives it a single pass
        let prediction_retry = PredictionRetry {
            attempts: retry.image_max_attempts,
            base_delay: chain_config.base_delay,
            max_delay: chain_config.max_delay,
        };

        let image_client = http_client(timeouts.image_request, timeouts.connection)?;
        let images = ProviderChainBuilder::new()
            .with_config(chain_config)
            .add_with_attempts(
                PollinationsProvider::new(config.image.pollinations_base_url.clone()),
                retry.pollinations_max_attempts,
            )
            .add_with_attempts(
                GeminiImagenProvider::new(image_client.clone(), &config.image, keys.gemini_secret()),
                retry.gemini_max_attempts,
            )
            .add_with_attempts(
                ReplicateFluxProvider::new(
                    image_client.clone(),
                    &config.image,
                    keys.replicate_secret(),
                )
                .with_retry(prediction_retry),
                1,
            )
            .add_with_attempts(
                ReplicateSdxlProvider::new(image_client, &config.image, keys.replicate_secret())
                    .with_retry(prediction_retry),
                1,
            )
            .build();

        let default_aspect_ratio = config.image.default_aspect_ratio.parse::<AspectRatio>()?;

        info!(
            text_providers = text.len(),
            image_providers = images.len(),
            "Studio ready"
        );

        Ok(Self {
            text,
            images,
            bank: QuestionBank::partner(),
            timeouts,
            partner_temperature: config.text.temperature,
            default_count: config.image.default_count,
            default_aspect_ratio,
        })
    }

    /// Studio over prebuilt chains with default settings
    pub fn with_chains(text: TextChain, images: ImageChain) -> Self {
        Self {
            text,
            images,
            bank: QuestionBank::partner(),
            timeouts: TimeoutConfig::default(),
            partner_temperature: text_constants::PARTNER_TEMPERATURE,
            default_count: image_constants::DEFAULT_COUNT,
            default_aspect_ratio: AspectRatio::default(),
        }
    }

    pub fn bank(&self) -> &'static QuestionBank {
        self.bank
    }

    /// Synthesize an ideal partner from interview answers
    #[instrument(skip_all, fields(answers = answers.len()))]
    pub async fn generate_partner(&self, answers: &[Answer]) -> Result<PartnerOutcome> {
        validate_answers(answers, 1)?;

        let mut request = partner_prompt(answers, self.bank);
        request.temperature = self.partner_temperature;

        let started = Instant::now();
        let (partner, stats) = with_timeout(
            self.timeouts.operation,
            self.text
                .execute_map("generate-partner", &request, |completion, provider| {
                    parse_validated::<PartnerProfile, _>(
                        provider,
                        &completion.content,
                        PartnerProfile::validate,
                    )
                }),
            "generate-partner",
        )
        .await?;

        let legacy_personality = partner.to_echo_personality();
        if let Err(e) = legacy_personality.validate() {
            warn!(error = %e, "Legacy personality outside display limits");
        }

        let generation_time_ms = started.elapsed().as_millis() as u64;
        info!(
            partner = %partner.name,
            model = stats.served_by(),
            attempts = stats.total_attempts,
            ms = generation_time_ms,
            "Partner generated"
        );

        Ok(PartnerOutcome {
            model: stats.served_by().to_string(),
            partner,
            legacy_personality,
            generation_time_ms,
        })
    }

    /// Synthesize an Echo personality from the full questionnaire
    #[instrument(skip_all, fields(answers = answers.len()))]
    pub async fn generate_personality(&self, answers: &[Answer]) -> Result<PersonalityOutcome> {
        validate_answers(answers, interview::MIN_PERSONALITY_ANSWERS)?;

        let request = professional_prompt(answers, self.bank);
        let started = Instant::now();
        let (profile, stats) = with_timeout(
            self.timeouts.operation,
            self.text
                .execute_map("generate-personality", &request, |completion, provider| {
                    parse_validated::<ProfessionalProfile, _>(
                        provider,
                        &completion.content,
                        ProfessionalProfile::validate,
                    )
                }),
            "generate-personality",
        )
        .await?;

        let generation_time_ms = started.elapsed().as_millis() as u64;
        info!(
            name = %profile.name,
            model = stats.served_by(),
            ms = generation_time_ms,
            "Personality generated"
        );

        Ok(PersonalityOutcome {
            personality: profile.to_echo_personality(),
            profile,
            generation_time_ms,
            model: stats.served_by().to_string(),
        })
    }

    /// Generate portraits, falling back across image backends
    #[instrument(skip_all, fields(subject = subject.name()))]
    pub async fn generate_images(
        &self,
        subject: PortraitSubject<'_>,
        count: Option<i64>,
        aspect_ratio: Option<AspectRatio>,
    ) -> Result<ImageOutcome> {
        if subject.name().trim().is_empty() {
            return Err(ValidationError::field("name", "profile has no name").into());
        }
        let requested = count.unwrap_or(i64::from(self.default_count));
        let count = u8::try_from(requested)
            .ok()
            .filter(|c| (1..=image_constants::MAX_COUNT).contains(c))
            .ok_or_else(|| {
                ValidationError::field(
                    "count",
                    format!(
                        "must be between 1 and {}, got {}",
                        image_constants::MAX_COUNT,
                        requested
                    ),
                )
            })?;
        let aspect_ratio = aspect_ratio.unwrap_or(self.default_aspect_ratio);

        let request = ImageRequest::for_subject(subject, count, aspect_ratio);
        let started = Instant::now();
        let (batch, stats) = with_timeout(
            self.timeouts.operation,
            self.images.execute("generate-images", &request),
            "generate-images",
        )
        .await?;

        if batch.images.is_empty() {
            return Err(EchoError::Parse(format!(
                "{} returned no images",
                stats.served_by()
            )));
        }

        let generation_time_ms = started.elapsed().as_millis() as u64;
        info!(
            images = batch.images.len(),
            used_model = %batch.model,
            attempts = stats.total_attempts,
            ms = generation_time_ms,
            "Images generated"
        );

        Ok(ImageOutcome {
            images: batch.images,
            used_model: batch.model,
            generation_time_ms,
        })
    }

    pub fn provider_status(&self) -> ProvidersReport {
        ProvidersReport {
            text: self.text.statuses(),
            image: self.images.statuses(),
        }
    }
}
