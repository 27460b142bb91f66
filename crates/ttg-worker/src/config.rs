//! Worker configuration.

use std::path::PathBuf;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding downloaded model snapshots
    pub models_dir: PathBuf,
    /// Maximum threads writing frame PNGs for one job
    pub max_frame_writers: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("video-gen-models"),
            max_frame_writers: 8,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            models_dir: std::env::var("TTG_MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("video-gen-models")),
            max_frame_writers: std::env::var("TTG_MAX_FRAME_WRITERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(8),
        }
    }
}
