//! Local model registry.
//!
//! Bookkeeping only: reports which snapshots are on disk and how large they
//! are. Nothing is loaded into memory here.

use std::path::{Path, PathBuf};

use ttg_models::{validate_repo_id, LocalModelInfo};

use crate::error::WorkerResult;

/// A snapshot counts as downloaded once this file exists.
pub const MODEL_INDEX_FILE: &str = "model_index.json";

#[derive(Debug, Clone)]
pub struct LocalModelRegistry {
    base_dir: PathBuf,
}

impl LocalModelRegistry {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub async fn ensure_base_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.base_dir).await
    }

    /// `<base>/<owner>__<name>`
    pub fn model_dir(&self, repo_id: &str) -> WorkerResult<PathBuf> {
        validate_repo_id(repo_id)?;
        Ok(self.base_dir.join(repo_id.replace('/', "__")))
    }

    pub async fn is_downloaded(&self, repo_id: &str) -> WorkerResult<bool> {
        let index = self.model_dir(repo_id)?.join(MODEL_INDEX_FILE);
        Ok(tokio::fs::try_exists(&index).await.unwrap_or(false))
    }

    /// Registry entry, recomputed from the filesystem.
    pub async fn model_info(&self, repo_id: &str) -> WorkerResult<LocalModelInfo> {
        let dir = self.model_dir(repo_id)?;
        let size_bytes = dir_size(&dir).await;
        Ok(LocalModelInfo {
            repo_id: repo_id.to_string(),
            downloaded: self.is_downloaded(repo_id).await?,
            path: dir.to_string_lossy().to_string(),
            size_bytes,
        })
    }
}

/// Total size of regular files below `root`; unreadable entries count as zero.
async fn dir_size(root: &Path) -> u64 {
    let mut total = 0u64;
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                if let Ok(meta) = entry.metadata().await {
                    total += meta.len();
                }
            }
        }
    }
    total
}
