//! Model catalogue and local model handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use ttg_models::{DownloadId, DownloadProgress, LocalModelInfo, SUPPORTED_MODELS};

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::state::AppState;

pub async fn supported_models() -> Json<Value> {
    Json(json!({ "models": SUPPORTED_MODELS }))
}

/// Trending text-to-video models. Hub failures are reported in the body,
/// never as an error status.
pub async fn trending_models(State(state): State<AppState>) -> Json<Value> {
    match state.hf.trending_models().await {
        Ok(models) => Json(json!({ "models": models })),
        Err(e) => {
            warn!("Failed to fetch trending models: {}", e);
            Json(json!({ "models": [], "error": e.to_string() }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LocalStatusQuery {
    pub repo_id: String,
}

pub async fn local_model_status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LocalStatusQuery>,
) -> ApiResult<Json<LocalModelInfo>> {
    Ok(Json(state.registry.model_info(query.repo_id.trim()).await?))
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub repo_id: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadStarted {
    pub ok: bool,
    pub download_id: DownloadId,
    pub model: String,
}

pub async fn start_model_download(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DownloadRequest>,
) -> ApiResult<Json<DownloadStarted>> {
    let repo_id = request.repo_id.trim();
    let record = state.downloads.start(repo_id).await?;
    info!(repo_id, download_id = %record.download_id, status = %record.status, "Model download requested");

    Ok(Json(DownloadStarted {
        ok: true,
        download_id: record.download_id,
        model: record.repo_id,
    }))
}

pub async fn model_download_progress(
    State(state): State<AppState>,
    Path(download_id): Path<String>,
) -> ApiResult<Json<DownloadProgress>> {
    state
        .downloads
        .progress(&DownloadId::from(download_id.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Download not found"))
}
