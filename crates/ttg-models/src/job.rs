//! Generation job identifiers and in-memory status records.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::video::VideoId;

/// Unique identifier for a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generation job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, worker not yet running
    #[default]
    Pending,
    /// Worker is generating
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status snapshot returned by `GET /status/{job_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct JobStatusRecord {
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<VideoId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
}

impl JobStatusRecord {
    /// A queued job with a reserved video entry.
    pub fn pending(video_id: VideoId) -> Self {
        Self {
            status: JobStatus::Pending,
            progress: 0,
            message: Some("Queued for processing".to_string()),
            video_id: Some(video_id),
            ..Default::default()
        }
    }

    /// A job rejected before any work was scheduled.
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Move to `processing` with a new stage message.
    pub fn set_stage(&mut self, progress: u8, message: impl Into<String>) {
        self.status = JobStatus::Processing;
        self.progress = progress.min(100);
        self.message = Some(message.into());
    }

    /// Mark as completed.
    pub fn complete(&mut self, elapsed_seconds: f64) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.message = Some("Completed".to_string());
        self.error = None;
        self.elapsed_seconds = Some(round_elapsed(elapsed_seconds));
    }

    /// Mark as failed.
    pub fn fail(&mut self, error: impl Into<String>, elapsed_seconds: f64) {
        self.status = JobStatus::Failed;
        self.message = Some("Failed".to_string());
        self.error = Some(error.into());
        self.elapsed_seconds = Some(round_elapsed(elapsed_seconds));
    }
}

fn round_elapsed(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&JobStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(JobStatus::Completed.to_string(), "completed");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_lifecycle() {
        let video_id = VideoId::new();
        let mut record = JobStatusRecord::pending(video_id.clone());
        assert_eq!(record.status, JobStatus::Pending);
        assert_eq!(record.message.as_deref(), Some("Queued for processing"));

        record.set_stage(250, "Preparing request");
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.progress, 100);

        record.set_stage(10, "Preparing request");
        record.complete(1.23456);
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.elapsed_seconds, Some(1.23));
        assert_eq!(record.video_id, Some(video_id));
    }

    #[test]
    fn test_failed_record_json_shape() {
        let mut record = JobStatusRecord::pending(VideoId::from("v1"));
        record.set_stage(30, "Contacting Hugging Face Inference API");
        record.fail("Invalid Hugging Face API token", 0.5);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["progress"], 30);
        assert_eq!(json["message"], "Failed");
        assert_eq!(json["error"], "Invalid Hugging Face API token");
        assert_eq!(json["video_id"], "v1");
    }

    #[test]
    fn test_rejected_omits_video() {
        let json = serde_json::to_value(JobStatusRecord::rejected("Empty prompt")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "Empty prompt");
        assert!(json.get("video_id").is_none());
    }
}
