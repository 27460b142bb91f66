//! Shared data models for the text-to-video backend.
//!
//! This crate provides Serde-serializable types for:
//! - Generation requests and their normalized parameters
//! - Video entries persisted in the metadata index
//! - In-memory job status records
//! - Local model registry and snapshot download progress
//! - Hardware reports and performance estimates

pub mod generation;
pub mod hardware;
pub mod job;
pub mod model;
pub mod video;

// Re-export common types
pub use generation::{GenerateRequest, GenerateResponse};
pub use hardware::{
    estimate_performance, CpuInfo, GpuDevice, GpuInfo, GpuMemory, HardwareInfo,
    PerformanceEstimate,
};
pub use job::{JobId, JobStatus, JobStatusRecord};
pub use model::{
    resolve_local_model, validate_repo_id, DownloadId, DownloadProgress, DownloadStatus,
    LocalModelInfo, RepoIdError, TrendingModel, SUPPORTED_MODELS,
};
pub use video::{VideoEntry, VideoId, VideoParams};
