//! Echo Studio - Personality Interview and Portrait Service
//!
//! Collects interview answers, synthesizes an idealized partner (or an echo
//! personality with a professional profile) through a chain of LLM
//! backends, and paints portraits through a chain of image backends.
//!
//! ## Core Features
//!
//! - **Interview**: Embedded partner question bank with navigation and required-answer checks
//! - **Text Chain**: DeepSeek Reasoner, DeepSeek Chat, OpenAI with retry and circuit breaking
//! - **Image Chain**: Pollinations, Gemini Imagen, Replicate Flux, Replicate SDXL
//! - **Validation**: JSON repair and schema checks before a profile is accepted
//! - **HTTP API**: axum routes mirroring the CLI commands
//!
//! ## Quick Start
//!
//! ```ignore
//! use echo_studio::{ConfigLoader, Studio};
//!
//! let config = ConfigLoader::load()?;
//! let studio = Studio::from_config(&config)?;
//! let outcome = studio.generate_partner(&answers).await?;
//! let images = studio
//!     .generate_images(PortraitSubject::Partner(&outcome.partner), None, None)
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: Provider chains, text and image backends, prompts, validation
//! - [`interview`]: Question bank and interview session
//! - [`studio`]: Generation service and saved echoes
//! - [`server`]: HTTP API
//! - [`config`]: Layered configuration

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod interview;
pub mod server;
pub mod studio;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader};

// Error Types
pub use types::error::{EchoError, ErrorCategory, ErrorCode, ProviderError, Result};

// Domain
pub use types::{
    Answer, AnswerValue, EchoPersonality, PartnerProfile, PortraitSubject, ProfessionalProfile,
};

// =============================================================================
// Service Re-exports
// =============================================================================

pub use interview::{InterviewSession, QuestionBank};
pub use server::{AppState, router};
pub use studio::{EchoStore, GenerationState, Studio};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    AspectRatio, ImageBatch, ImageRequest, Provider, ProviderChain, ProviderChainBuilder,
    TextCompletion, TextRequest, TimeoutConfig, with_timeout,
};
