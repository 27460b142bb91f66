//! Structured job logging.

use tracing::{error, info, warn, Span};
use ttg_models::{JobId, VideoId};

/// Stamps every job event with the job id, video id and generation mode.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    video_id: String,
    mode: &'static str,
}

impl JobLogger {
    /// `mode` names the requested path: "cloud", "local" or "placeholder".
    pub fn new(job_id: &JobId, video_id: &VideoId, mode: &'static str) -> Self {
        Self {
            job_id: job_id.to_string(),
            video_id: video_id.to_string(),
            mode,
        }
    }

    pub fn log_start(&self, prompt_chars: usize) {
        info!(
            job_id = %self.job_id,
            video_id = %self.video_id,
            mode = self.mode,
            prompt_chars,
            "Generation started"
        );
    }

    pub fn log_stage(&self, progress: u8, message: &str) {
        info!(
            job_id = %self.job_id,
            video_id = %self.video_id,
            mode = self.mode,
            progress,
            "Stage: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            video_id = %self.video_id,
            mode = self.mode,
            "{}", message
        );
    }

    pub fn log_failure(&self, error: &str, elapsed_secs: f64) {
        error!(
            job_id = %self.job_id,
            video_id = %self.video_id,
            mode = self.mode,
            elapsed_secs,
            "Generation failed: {}", error
        );
    }

    pub fn log_completion(&self, frames: u32, elapsed_secs: f64) {
        info!(
            job_id = %self.job_id,
            video_id = %self.video_id,
            mode = self.mode,
            frames,
            elapsed_secs,
            "Generation completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn mode(&self) -> &'static str {
        self.mode
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "generation",
            job_id = %self.job_id,
            video_id = %self.video_id,
            mode = self.mode
        )
    }
}
