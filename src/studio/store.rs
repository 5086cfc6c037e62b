//! Saved echoes and generation progress

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::constants::image::MAX_COUNT;
use crate::constants::store::MAX_SAVED_ECHOES;
use crate::types::{EchoError, EchoPersonality, Result, ValidationError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveEchoRequest {
    pub personality: EchoPersonality,
    #[serde(default, alias = "allImages")]
    pub images: Vec<String>,
    #[serde(default)]
    pub selected_image: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedEcho {
    pub echo_id: Uuid,
    pub personality: EchoPersonality,
    pub images: Vec<String>,
    pub selected_image: Option<usize>,
    pub saved_at: DateTime<Utc>,
}

impl SavedEcho {
    pub fn selected_image_url(&self) -> Option<&str> {
        self.selected_image
            .and_then(|i| self.images.get(i))
            .map(String::as_str)
    }
}

/// In-memory echo store shared across request handlers
///
/// Holds at most `capacity` echoes; saving past that evicts the oldest.
#[derive(Debug, Clone)]
pub struct EchoStore {
    echoes: Arc<DashMap<Uuid, SavedEcho>>,
    capacity: usize,
}

impl Default for EchoStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SAVED_ECHOES)
    }
}

impl EchoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            echoes: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn save(&self, request: SaveEchoRequest) -> Result<SavedEcho> {
        request.personality.validate().map_err(|e| ValidationError {
            field: e.field.map(|f| format!("personality.{}", f)),
            message: e.message,
        })?;
        if request.images.len() > usize::from(MAX_COUNT) {
            return Err(ValidationError::field(
                "images",
                format!(
                    "at most {} images per echo, got {}",
                    MAX_COUNT,
                    request.images.len()
                ),
            )
            .into());
        }
        if let Some(index) = request.selected_image
            && index >= request.images.len()
        {
            return Err(ValidationError::field(
                "selectedImage",
                format!("index {} out of range for {} images", index, request.images.len()),
            )
            .into());
        }

        let echo = SavedEcho {
            echo_id: Uuid::new_v4(),
            personality: request.personality,
            images: request.images,
            selected_image: request.selected_image,
            saved_at: Utc::now(),
        };
        while self.echoes.len() >= self.capacity {
            self.evict_oldest();
        }
        debug!(echo_id = %echo.echo_id, images = echo.images.len(), "Echo saved");
        self.echoes.insert(echo.echo_id, echo.clone());
        Ok(echo)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .echoes
            .iter()
            .min_by_key(|entry| entry.value().saved_at)
            .map(|entry| *entry.key());
        if let Some(id) = oldest {
            self.echoes.remove(&id);
            debug!(echo_id = %id, capacity = self.capacity, "Evicted oldest echo");
        }
    }

    pub fn get(&self, id: &str) -> Result<SavedEcho> {
        let uuid = Uuid::parse_str(id)
            .map_err(|_| EchoError::InvalidInput(format!("'{}' is not an echo id", id)))?;
        self.echoes
            .get(&uuid)
            .map(|e| e.value().clone())
            .ok_or_else(|| EchoError::NotFound(format!("echo {}", id)))
    }

    pub fn len(&self) -> usize {
        self.echoes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.echoes.is_empty()
    }
}

// =============================================================================
// Generation State
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationStatus {
    #[default]
    Idle,
    GeneratingPersonality,
    GeneratingImages,
    Completed,
    Error,
}

/// Progress of one personality-then-portraits run
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub status: GenerationStatus,
    pub error: Option<String>,
    pub personality: Option<EchoPersonality>,
    pub images: Vec<String>,
    pub selected_image_index: usize,
    pub used_model: Option<String>,
    pub personality_generated_at: Option<DateTime<Utc>>,
    pub images_generated_at: Option<DateTime<Utc>>,
}

impl GenerationState {
    pub fn set_status(&mut self, status: GenerationStatus) {
        self.status = status;
        self.error = None;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.status = GenerationStatus::Error;
    }

    pub fn set_personality(&mut self, personality: EchoPersonality) {
        self.personality = Some(personality);
        self.personality_generated_at = Some(Utc::now());
        self.set_status(GenerationStatus::Completed);
    }

    /// Store a fresh batch; selection resets to the first image
    pub fn set_images(&mut self, images: Vec<String>, used_model: impl Into<String>) {
        self.images = images;
        self.used_model = Some(used_model.into());
        self.images_generated_at = Some(Utc::now());
        self.selected_image_index = 0;
        self.set_status(GenerationStatus::Completed);
    }

    /// Out-of-range indices are ignored
    pub fn select_image(&mut self, index: usize) -> bool {
        if index < self.images.len() {
            self.selected_image_index = index;
            true
        } else {
            false
        }
    }

    pub fn selected_image(&self) -> Option<&str> {
        self.images
            .get(self.selected_image_index)
            .map(String::as_str)
    }

    pub fn is_generating(&self) -> bool {
        matches!(
            self.status,
            GenerationStatus::GeneratingPersonality | GenerationStatus::GeneratingImages
        )
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Request that persists the current result
    pub fn to_save_request(&self) -> Option<SaveEchoRequest> {
        let personality = self.personality.clone()?;
        Some(SaveEchoRequest {
            personality,
            selected_image: (!self.images.is_empty()).then_some(self.selected_image_index),
            images: self.images.clone(),
        })
    }
}
