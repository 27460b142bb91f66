//! Generation request and response types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::job::{JobId, JobStatus};
use crate::video::{VideoId, VideoParams};

pub const MIN_WIDTH: u32 = 128;
pub const MAX_WIDTH: u32 = 1920;
pub const MIN_HEIGHT: u32 = 128;
pub const MAX_HEIGHT: u32 = 1080;
pub const MAX_FRAMES: u32 = 120;
pub const MAX_FPS: u32 = 60;
pub const MAX_INFERENCE_STEPS: u32 = 200;

/// Dimensions are snapped down to a multiple of this.
pub const DIMENSION_ALIGNMENT: u32 = 8;

fn default_num_frames() -> i64 {
    24
}

fn default_fps() -> i64 {
    8
}

fn default_dimension() -> i64 {
    512
}

fn default_use_hf_api() -> bool {
    true
}

fn default_steps() -> i64 {
    50
}

fn default_guidance() -> f32 {
    7.5
}

/// Body of `POST /generate`.
///
/// Numeric fields are signed so out-of-range input is clamped by
/// [`GenerateRequest::normalized_params`] rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default = "default_num_frames")]
    pub num_frames: i64,
    #[serde(default = "default_fps")]
    pub fps: i64,
    #[serde(default = "default_dimension")]
    pub width: i64,
    #[serde(default = "default_dimension")]
    pub height: i64,
    #[serde(default = "default_use_hf_api")]
    pub use_hf_api: bool,
    #[serde(default)]
    pub hf_token: Option<String>,
    #[serde(default)]
    pub hf_model_repo: Option<String>,
    #[serde(default)]
    pub local_model_key: Option<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default = "default_steps")]
    pub num_inference_steps: i64,
    #[serde(default = "default_guidance")]
    pub guidance_scale: f32,
    #[serde(default)]
    pub seed: Option<i64>,
}

impl GenerateRequest {
    /// Create a request with default parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            num_frames: default_num_frames(),
            fps: default_fps(),
            width: default_dimension(),
            height: default_dimension(),
            use_hf_api: default_use_hf_api(),
            hf_token: None,
            hf_model_repo: None,
            local_model_key: None,
            negative_prompt: None,
            num_inference_steps: default_steps(),
            guidance_scale: default_guidance(),
            seed: None,
        }
    }

    /// Cloud mode needs a token before anything is queued.
    pub fn is_missing_token(&self) -> bool {
        self.use_hf_api
            && self
                .hf_token
                .as_deref()
                .map(|t| t.trim().is_empty())
                .unwrap_or(true)
    }

    /// Whether the prompt carries any text.
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Clamp the request into the parameters the worker uses.
    pub fn normalized_params(&self) -> VideoParams {
        VideoParams {
            prompt: self.prompt.trim().to_string(),
            num_frames: clamp_to(self.num_frames, 1, MAX_FRAMES),
            fps: clamp_to(self.fps, 1, MAX_FPS),
            width: align_dimension(self.width, MIN_WIDTH, MAX_WIDTH),
            height: align_dimension(self.height, MIN_HEIGHT, MAX_HEIGHT),
            num_inference_steps: clamp_to(self.num_inference_steps, 1, MAX_INFERENCE_STEPS),
            guidance_scale: self.guidance_scale,
            negative_prompt: self
                .negative_prompt
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            // Negative seeds wrap; only determinism matters.
            seed: self.seed.map(|s| s as u64),
            local_model_key: self.local_model_key.clone().filter(|s| !s.is_empty()),
            hf_model_repo: self.hf_model_repo.clone().filter(|s| !s.is_empty()),
            use_hf_api: self.use_hf_api,
        }
    }
}

fn clamp_to(value: i64, min: u32, max: u32) -> u32 {
    // Bounded by `max`, so the cast is lossless.
    value.clamp(i64::from(min), i64::from(max)) as u32
}

fn align_dimension(value: i64, min: u32, max: u32) -> u32 {
    (clamp_to(value, min, max) / DIMENSION_ALIGNMENT) * DIMENSION_ALIGNMENT
}

/// Response of `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,
}
