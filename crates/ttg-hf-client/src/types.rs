//! Request and response types for Hugging Face endpoints.

use serde::{Deserialize, Serialize};
use ttg_models::{TrendingModel, VideoParams};

const DEFAULT_NEGATIVE_PROMPT: &str = "blurry, low quality, noisy";

// Limits the hosted text-to-video pipelines accept.
const MAX_HEIGHT: u32 = 576;
const MAX_WIDTH: u32 = 1024;
const MAX_STEPS: u32 = 50;
const MIN_FRAMES: u32 = 8;
const HOSTED_FPS: u32 = 8;

/// Body posted to the inference router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferencePayload {
    pub inputs: String,
    pub parameters: InferenceParameters,
    pub options: InferenceOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceParameters {
    pub negative_prompt: String,
    pub height: u32,
    pub width: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub num_frames: u32,
    pub fps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOptions {
    pub use_cache: bool,
    pub wait_for_model: bool,
}

impl InferencePayload {
    /// Build the hosted-inference payload, clamped to what the router accepts.
    pub fn from_params(params: &VideoParams) -> Self {
        Self {
            inputs: params.prompt.clone(),
            parameters: InferenceParameters {
                negative_prompt: params
                    .negative_prompt
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NEGATIVE_PROMPT.to_string()),
                height: params.height.min(MAX_HEIGHT),
                width: params.width.min(MAX_WIDTH),
                num_inference_steps: params.num_inference_steps.min(MAX_STEPS),
                guidance_scale: params.guidance_scale,
                num_frames: params.num_frames.max(MIN_FRAMES),
                fps: HOSTED_FPS,
                seed: params.seed,
            },
            options: InferenceOptions {
                use_cache: true,
                wait_for_model: true,
            },
        }
    }
}

/// Result of `POST /hf-validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidation {
    pub valid: bool,
    pub message: String,
}

impl TokenValidation {
    pub fn valid() -> Self {
        Self {
            valid: true,
            message: "Token is valid".to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// One file of a model snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    #[serde(rename = "rfilename")]
    pub path: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Model metadata from `GET /api/models/{repo}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RepoInfo {
    #[serde(default)]
    pub siblings: Vec<RepoFile>,
}

/// Entry of `GET /api/models` search results.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HubModel {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "modelId", default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(rename = "downloadsAllTime", default)]
    pub downloads_all_time: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "lastModified", default)]
    pub last_modified: Option<String>,
}

impl HubModel {
    pub(crate) fn into_trending(self) -> Option<TrendingModel> {
        let id = self.id.or(self.model_id)?;
        Some(TrendingModel {
            id,
            likes: self.likes,
            downloads: self.downloads.or(self.downloads_all_time),
            tags: self.tags,
            updated_at: self.last_modified,
        })
    }
}
