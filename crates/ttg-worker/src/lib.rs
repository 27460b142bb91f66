//! Video generation worker.
//!
//! This crate provides:
//! - The generation job orchestrator and its in-memory status registry
//! - Cloud (Hugging Face), local model and placeholder generation paths
//! - Local model registry and background snapshot downloads
//! - Structured per-job logging and job metrics

pub mod config;
pub mod downloads;
pub mod error;
pub mod generator;
pub mod local;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod status;

pub use config::WorkerConfig;
pub use downloads::DownloadManager;
pub use error::{WorkerError, WorkerResult};
pub use generator::VideoGenerator;
pub use local::{LocalGenerationRequest, LocalPipeline, UnavailablePipeline};
pub use logging::JobLogger;
pub use models::LocalModelRegistry;
pub use status::JobRegistry;
