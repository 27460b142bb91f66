//! Model catalog, local model registry and snapshot download types.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Curated text-to-video repositories offered by `GET /models/supported`.
pub const SUPPORTED_MODELS: &[&str] = &[
    "meituan-longcat/LongCat-Video",
    "krea/krea-realtime-video",
    "QuantStack/Wan2.2-T2V-A14B-GGUF",
    "Wan-AI/Wan2.2-TI2V-5B",
    "hpcai-tech/Open-Sora-v2",
    "Wan-AI/Wan2.2-T2V-A14B",
    "lightx2v/Wan2.2-Lightning",
    "alibaba-pai/Wan2.2-Fun-Reward-LoRAs",
    "BAAI/URSA-1.7B-FSQ320",
    "tencent/HunyuanVideo",
    "Wan-AI/Wan2.1-T2V-14B",
    "genmo/mochi-1-preview",
    "Wan-AI/Wan2.1-T2V-1.3B-Diffusers",
    "Skywork/SkyReels-V2-DF-14B-720P",
    "vrgamedevgirl84/Wan14BT2VFusioniX",
    "Wan-AI/Wan2.2-T2V-A14B-Diffusers",
    "Wan-AI/Wan2.1-T2V-1.3B",
    "calcuis/wan-gguf",
    "QuantStack/Wan2.1_14B_VACE-GGUF",
    "Wan-AI/Wan2.2-TI2V-5B-Diffusers",
    "QuantStack/Wan2.2-TI2V-5B-GGUF",
    "bullerwins/Wan2.2-T2V-A14B-GGUF",
    "Cseti/wan2.2-14B-Kinestasis_concept-lora-v1",
    "akhaliq/sora-2",
    "akhaliq/veo3.1-fast",
    "TencentARC/RollingForcing",
    "QuantStack/HoloCine-GGUF",
    "ali-vilab/modelscope-damo-text-to-video-synthesis",
    "ali-vilab/i2vgen-xl",
    "damo-vilab/text-to-video-ms-1.7b",
];

/// Local model keys accepted in `local_model_key` and the repos they map to.
const LOCAL_MODEL_KEYS: &[(&str, &str)] = &[
    ("zeroscope-local", "cerspense/zeroscope_v2_576w"),
    (
        "modelscope-local",
        "ali-vilab/modelscope-damo-text-to-video-synthesis",
    ),
];

/// Resolve a local model key to its Hugging Face repo id.
pub fn resolve_local_model(key: &str) -> Option<&'static str> {
    LOCAL_MODEL_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, repo)| *repo)
}

/// Errors from repo id validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoIdError {
    #[error("repo_id is required")]
    Empty,
    #[error("repo_id must look like 'owner/name'")]
    Malformed,
    #[error("repo_id contains invalid characters")]
    InvalidCharacters,
}

/// Validate a Hugging Face repo id of the form `owner/name`.
///
/// Repo ids become directory names, so path-like segments are rejected.
pub fn validate_repo_id(repo_id: &str) -> Result<(), RepoIdError> {
    if repo_id.trim().is_empty() {
        return Err(RepoIdError::Empty);
    }
    let mut parts = repo_id.split('/');
    let (Some(owner), Some(name), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(RepoIdError::Malformed);
    };
    for part in [owner, name] {
        if part.is_empty() || part.len() > 96 {
            return Err(RepoIdError::Malformed);
        }
        if part == "." || part == ".." || part.starts_with('.') {
            return Err(RepoIdError::InvalidCharacters);
        }
        if !part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(RepoIdError::InvalidCharacters);
        }
    }
    Ok(())
}

/// Registry view of one local snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LocalModelInfo {
    pub repo_id: String,
    pub downloaded: bool,
    pub path: String,
    pub size_bytes: u64,
}

/// Trending model summary returned by `GET /models/trending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrendingModel {
    pub id: String,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<String>,
}

/// Unique identifier for a snapshot download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DownloadId(pub String);

impl DownloadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DownloadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Snapshot download state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of a snapshot download, polled by the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DownloadProgress {
    pub download_id: DownloadId,
    pub repo_id: String,
    pub status: DownloadStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub files_completed: u32,
    pub files_total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DownloadProgress {
    pub fn new(repo_id: impl Into<String>) -> Self {
        Self {
            download_id: DownloadId::new(),
            repo_id: repo_id.into(),
            status: DownloadStatus::Pending,
            progress: 0,
            downloaded_bytes: 0,
            total_bytes: 0,
            files_completed: 0,
            files_total: 0,
            error: None,
        }
    }

    /// Record bytes written and recompute the percentage.
    pub fn add_bytes(&mut self, bytes: u64) {
        self.downloaded_bytes += bytes;
        self.recompute();
    }

    /// Record a finished file.
    pub fn finish_file(&mut self) {
        self.files_completed = (self.files_completed + 1).min(self.files_total.max(1));
        self.recompute();
    }

    pub fn complete(&mut self) {
        self.status = DownloadStatus::Completed;
        self.progress = 100;
        self.error = None;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = DownloadStatus::Failed;
        self.error = Some(error.into());
    }

    fn recompute(&mut self) {
        // Byte counts are preferred; sizes are missing for some repos.
        let pct = if self.total_bytes > 0 {
            self.downloaded_bytes.saturating_mul(100) / self.total_bytes
        } else if self.files_total > 0 {
            u64::from(self.files_completed) * 100 / u64::from(self.files_total)
        } else {
            0
        };
        // 100 is reserved for completion.
        self.progress = pct.min(99) as u8;
    }
}
