use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiResult;
use crate::ai::prompt::AspectRatio;
use crate::interview::Question;
use crate::studio::{
    ImageOutcome, PartnerOutcome, PersonalityOutcome, ProvidersReport, SaveEchoRequest, SavedEcho,
};
use crate::types::{Answer, EchoPersonality, PartnerProfile, PortraitSubject, ValidationError};

#[derive(Debug, Deserialize)]
pub struct AnswersRequest {
    #[serde(default)]
    pub answers: Vec<Answer>,
}

/// Either profile may be sent; `partner` gives richer prompts and wins
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImageRequest {
    pub personality: Option<EchoPersonality>,
    pub partner: Option<PartnerProfile>,
    /// Range-checked by the studio so out-of-range values report on `count`
    pub count: Option<i64>,
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub total: usize,
    pub questions: &'static [Question],
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub async fn providers(State(state): State<AppState>) -> Json<ProvidersReport> {
    Json(state.studio.provider_status())
}

pub async fn questions(State(state): State<AppState>) -> Json<QuestionsResponse> {
    let bank = state.studio.bank();
    Json(QuestionsResponse {
        total: bank.len(),
        questions: bank.questions(),
    })
}

pub async fn generate_partner(
    State(state): State<AppState>,
    payload: Result<Json<AnswersRequest>, JsonRejection>,
) -> ApiResult<Json<PartnerOutcome>> {
    let Json(body) = payload?;
    Ok(Json(state.studio.generate_partner(&body.answers).await?))
}

pub async fn generate_personality(
    State(state): State<AppState>,
    payload: Result<Json<AnswersRequest>, JsonRejection>,
) -> ApiResult<Json<PersonalityOutcome>> {
    let Json(body) = payload?;
    Ok(Json(state.studio.generate_personality(&body.answers).await?))
}

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> ApiResult<Json<ImageOutcome>> {
    let Json(body) = payload?;
    let subject = match (&body.partner, &body.personality) {
        (Some(partner), _) => PortraitSubject::Partner(partner),
        (None, Some(personality)) => PortraitSubject::Echo(personality),
        (None, None) => {
            return Err(ValidationError::field("personality", "personality or partner is required").into());
        }
    };
    let outcome = state
        .studio
        .generate_images(subject, body.count, body.aspect_ratio)
        .await?;
    Ok(Json(outcome))
}

pub async fn save_echo(
    State(state): State<AppState>,
    payload: Result<Json<SaveEchoRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SavedEcho>)> {
    let Json(body) = payload?;
    let saved = state.store.save(body)?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn get_echo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SavedEcho>> {
    Ok(Json(state.store.get(&id)?))
}
