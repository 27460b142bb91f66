//! Video entry types.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a generated video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Normalized generation parameters stored alongside each video.
///
/// These are the values actually used by the worker, after clamping.
/// The Hugging Face token is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoParams {
    pub prompt: String,
    pub num_frames: u32,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub local_model_key: Option<String>,
    #[serde(default)]
    pub hf_model_repo: Option<String>,
    #[serde(default)]
    pub use_hf_api: bool,
}

/// A persisted video entry in the metadata index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoEntry {
    pub id: VideoId,
    pub created_at: DateTime<Utc>,
    /// Number of frames on disk, finalized once by the worker.
    pub frame_count: u32,
    pub params: VideoParams,
}

impl VideoEntry {
    /// Create a fresh entry with a new ID and no frames.
    pub fn new(params: VideoParams) -> Self {
        Self {
            id: VideoId::new(),
            created_at: Utc::now(),
            frame_count: 0,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VideoParams {
        VideoParams {
            prompt: "a cat surfing".to_string(),
            num_frames: 24,
            fps: 8,
            width: 512,
            height: 512,
            num_inference_steps: 50,
            guidance_scale: 7.5,
            negative_prompt: None,
            seed: Some(42),
            local_model_key: None,
            hf_model_repo: None,
            use_hf_api: false,
        }
    }

    #[test]
    fn test_video_id_is_uuid() {
        let id = VideoId::new();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
        assert_ne!(id, VideoId::new());
    }

    #[test]
    fn test_entry_serializes_flat_id() {
        let entry = VideoEntry::new(params());
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["id"], entry.id.as_str());
        assert_eq!(json["frame_count"], 0);
        assert_eq!(json["params"]["prompt"], "a cat surfing");
        assert_eq!(json["params"]["seed"], 42);
    }

    #[test]
    fn test_entry_roundtrip_with_missing_optional_params() {
        let json = r#"{
            "id": "abc",
            "created_at": "2024-05-01T10:00:00Z",
            "frame_count": 6,
            "params": {
                "prompt": "x", "num_frames": 6, "fps": 8, "width": 256, "height": 256,
                "num_inference_steps": 50, "guidance_scale": 7.5
            }
        }"#;
        let entry: VideoEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.id, VideoId::from("abc"));
        assert_eq!(entry.frame_count, 6);
        assert!(!entry.params.use_hf_api);
        assert!(entry.params.negative_prompt.is_none());
    }
}
