//! Worker error types.
//!
//! Job failures are reported to clients through the `Display` output of
//! these errors, so messages are written for end users.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Unknown local model key: {0}")]
    UnknownModelKey(String),

    #[error("Local model '{0}' is not downloaded. Trigger a download before using it.")]
    ModelNotDownloaded(String),

    #[error("Local model snapshot is incomplete: {0}")]
    IncompleteSnapshot(String),

    #[error("{0}")]
    LocalPipeline(String),

    #[error("No frames generated")]
    NoFrames,

    #[error("Failed to save video file from HF response")]
    VideoSaveFailed(#[source] ttg_storage::StorageError),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error(transparent)]
    InvalidRepoId(#[from] ttg_models::RepoIdError),

    #[error(transparent)]
    Hf(#[from] ttg_hf_client::HfError),

    #[error("Storage error: {0}")]
    Storage(#[from] ttg_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] ttg_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn local_pipeline(msg: impl Into<String>) -> Self {
        Self::LocalPipeline(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Media(ttg_media::MediaError::from(e))
    }
}
