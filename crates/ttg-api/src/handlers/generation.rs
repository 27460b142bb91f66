//! Generation, job status and token validation handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use ttg_hf_client::TokenValidation;
use ttg_models::{GenerateRequest, GenerateResponse, JobId, JobStatusRecord};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::security::{is_valid_id, log_preview};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HfValidateRequest {
    pub hf_token: String,
}

/// Check a Hugging Face token. Validity is reported in the body, not the status.
pub async fn validate_hf_token(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<HfValidateRequest>,
) -> Json<TokenValidation> {
    Json(state.hf.validate_token(request.hf_token.trim()).await)
}

/// Start a generation job.
pub async fn generate_video(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GenerateResponse>> {
    if request.is_missing_token() {
        return Err(ApiError::bad_request(
            "Hugging Face token required for cloud generation",
        ));
    }

    info!(
        prompt = %log_preview(&request.prompt),
        use_hf_api = request.use_hf_api,
        local_model_key = request.local_model_key.as_deref().unwrap_or(""),
        "Generation requested"
    );

    let response = state.generator.start(request).await;
    Ok(Json(response))
}

/// Poll a job.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusRecord>> {
    if !is_valid_id(&job_id) {
        return Err(ApiError::not_found("Job not found"));
    }
    state
        .generator
        .status(&JobId::from_string(job_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}
