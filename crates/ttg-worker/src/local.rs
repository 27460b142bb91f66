//! Local model inference seam.
//!
//! Running a diffusion pipeline is delegated to a [`LocalPipeline`]
//! implementation. The default build ships [`UnavailablePipeline`], which
//! reports that no inference backend is installed; jobs then fall back to
//! Hugging Face or fail with that message, exactly as when a model is missing.

use std::path::Path;

use async_trait::async_trait;
use ttg_media::RgbImage;
use ttg_models::VideoParams;

use crate::error::{WorkerError, WorkerResult};

/// Parameters handed to a local pipeline, clamped to keep resource use sane.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalGenerationRequest {
    pub model_key: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub num_frames: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub seed: Option<u64>,
}

impl LocalGenerationRequest {
    pub fn from_params(model_key: &str, params: &VideoParams) -> WorkerResult<Self> {
        if params.prompt.trim().is_empty() {
            return Err(WorkerError::local_pipeline(
                "Prompt must not be empty for local generation.",
            ));
        }
        Ok(Self {
            model_key: model_key.to_string(),
            prompt: params.prompt.clone(),
            negative_prompt: params.negative_prompt.clone(),
            width: params.width.clamp(256, 1024),
            height: params.height.clamp(256, 576),
            num_frames: params.num_frames.clamp(8, 48),
            num_inference_steps: params.num_inference_steps.clamp(10, 60),
            guidance_scale: params.guidance_scale,
            seed: params.seed,
        })
    }
}

/// Runs a downloaded text-to-video snapshot.
#[async_trait]
pub trait LocalPipeline: Send + Sync {
    async fn generate(
        &self,
        model_dir: &Path,
        request: &LocalGenerationRequest,
    ) -> WorkerResult<Vec<RgbImage>>;
}

/// Pipeline used when the binary carries no inference backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePipeline;

#[async_trait]
impl LocalPipeline for UnavailablePipeline {
    async fn generate(
        &self,
        _model_dir: &Path,
        request: &LocalGenerationRequest,
    ) -> WorkerResult<Vec<RgbImage>> {
        Err(WorkerError::local_pipeline(format!(
            "No local inference backend is available to run '{}'",
            request.model_key
        )))
    }
}
