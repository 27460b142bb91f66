//! Local filesystem video storage.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use ttg_models::{VideoEntry, VideoId, VideoParams};

use crate::error::{StorageError, StorageResult};

const METADATA_FILE: &str = "metadata.json";

/// Name of the stitched or downloaded video inside a video directory.
pub const VIDEO_FILE: &str = "output.mp4";

/// Video directories plus the `metadata.json` index.
///
/// All index mutations are serialized through one lock and rewrite the
/// whole index file (last write wins).
pub struct VideoStorage {
    base_path: PathBuf,
    metadata_path: PathBuf,
    index: RwLock<BTreeMap<String, VideoEntry>>,
}

impl VideoStorage {
    /// Open (and create if needed) storage rooted at `base_path`.
    pub async fn open(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        tokio::fs::create_dir_all(&base_path).await?;
        let metadata_path = base_path.join(METADATA_FILE);
        let index = load_index(&metadata_path).await?;

        info!(
            path = %base_path.display(),
            videos = index.len(),
            "Opened video storage"
        );

        Ok(Self {
            base_path,
            metadata_path,
            index: RwLock::new(index),
        })
    }

    /// Directory holding the files of one video.
    pub fn video_dir(&self, id: &VideoId) -> StorageResult<PathBuf> {
        if !is_safe_id(id.as_str()) {
            return Err(StorageError::invalid_id(id.as_str()));
        }
        Ok(self.base_path.join(id.as_str()))
    }

    /// Create an entry with a fresh id and its directory.
    pub async fn create_video_entry(&self, params: VideoParams) -> StorageResult<VideoEntry> {
        let entry = VideoEntry::new(params);
        tokio::fs::create_dir_all(self.video_dir(&entry.id)?).await?;

        let mut index = self.index.write().await;
        let mut next = index.clone();
        next.insert(entry.id.to_string(), entry.clone());
        self.persist(&next).await?;
        *index = next;

        debug!(video_id = %entry.id, "Created video entry");
        Ok(entry)
    }

    /// Record the final frame count of a video.
    pub async fn update_video_frames(&self, id: &VideoId, frame_count: u32) -> StorageResult<VideoEntry> {
        let mut index = self.index.write().await;
        let mut next = index.clone();
        let entry = next
            .get_mut(id.as_str())
            .ok_or_else(|| StorageError::not_found(id.as_str()))?;
        entry.frame_count = frame_count;
        let updated = entry.clone();
        self.persist(&next).await?;
        *index = next;

        Ok(updated)
    }

    /// All entries, oldest first.
    pub async fn list_videos(&self) -> Vec<VideoEntry> {
        let index = self.index.read().await;
        let mut videos: Vec<VideoEntry> = index.values().cloned().collect();
        videos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        videos
    }

    pub async fn get_video(&self, id: &VideoId) -> Option<VideoEntry> {
        self.index.read().await.get(id.as_str()).cloned()
    }

    /// Remove the entry and everything on disk for it.
    pub async fn delete_video(&self, id: &VideoId) -> StorageResult<()> {
        {
            let mut index = self.index.write().await;
            if !index.contains_key(id.as_str()) {
                return Err(StorageError::not_found(id.as_str()));
            }
            let mut next = index.clone();
            next.remove(id.as_str());
            self.persist(&next).await?;
            *index = next;
        }

        let dir = self.video_dir(id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(video_id = %id, "Failed to remove video directory: {}", e),
        }

        info!(video_id = %id, "Deleted video");
        Ok(())
    }

    /// Write downloaded video bytes as the video's `output.mp4`.
    pub async fn save_video_bytes(&self, id: &VideoId, bytes: &[u8]) -> StorageResult<PathBuf> {
        let dir = self.video_dir(id)?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(VIDEO_FILE);
        tokio::fs::write(&path, bytes).await?;

        debug!(video_id = %id, bytes = bytes.len(), "Saved video bytes");
        Ok(path)
    }

    /// Frame PNGs of a video in playback order. Empty when the directory
    /// does not exist.
    pub async fn frame_files(&self, id: &VideoId) -> StorageResult<Vec<PathBuf>> {
        let dir = self.video_dir(id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut frames = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("frame_") && name.ends_with(".png") {
                frames.push(entry.path());
            }
        }
        frames.sort();
        Ok(frames)
    }

    async fn persist(&self, index: &BTreeMap<String, VideoEntry>) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(index)?;
        let tmp = self.metadata_path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.metadata_path).await?;
        Ok(())
    }
}

/// Ids become directory names; only plain tokens are allowed.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn load_index(path: &Path) -> StorageResult<BTreeMap<String, VideoEntry>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    let values: BTreeMap<String, serde_json::Value> = match serde_json::from_slice(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), "Metadata index is corrupt, starting empty: {}", e);
            return Ok(BTreeMap::new());
        }
    };

    let mut index = BTreeMap::new();
    for (id, value) in values {
        match serde_json::from_value::<VideoEntry>(value) {
            Ok(entry) => {
                index.insert(id, entry);
            }
            Err(e) => warn!(video_id = %id, "Skipping unreadable metadata entry: {}", e),
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(prompt: &str) -> VideoParams {
        VideoParams {
            prompt: prompt.to_string(),
            num_frames: 6,
            fps: 8,
            width: 256,
            height: 256,
            num_inference_steps: 50,
            guidance_scale: 7.5,
            negative_prompt: None,
            seed: None,
            local_model_key: None,
            hf_model_repo: None,
            use_hf_api: false,
        }
    }

    #[tokio::test]
    async fn test_create_get_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VideoStorage::open(dir.path().join("videos")).await.unwrap();

        let first = storage.create_video_entry(params("first")).await.unwrap();
        let second = storage.create_video_entry(params("second")).await.unwrap();

        assert!(storage.video_dir(&first.id).unwrap().is_dir());
        assert_eq!(storage.get_video(&first.id).await.unwrap().params.prompt, "first");

        let listed = storage.list_videos().await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let storage = VideoStorage::open(dir.path()).await.unwrap();
            let entry = storage.create_video_entry(params("persisted")).await.unwrap();
            storage.update_video_frames(&entry.id, 6).await.unwrap();
            entry.id
        };

        let raw = std::fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap();
        assert!(raw.contains("\n  \""), "index should be pretty-printed");

        let reopened = VideoStorage::open(dir.path()).await.unwrap();
        let entry = reopened.get_video(&id).await.unwrap();
        assert_eq!(entry.frame_count, 6);
        assert_eq!(entry.params.prompt, "persisted");
    }

    #[tokio::test]
    async fn test_delete_removes_entry_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VideoStorage::open(dir.path()).await.unwrap();
        let entry = storage.create_video_entry(params("gone")).await.unwrap();
        storage.save_video_bytes(&entry.id, b"not really mp4").await.unwrap();

        let video_dir = storage.video_dir(&entry.id).unwrap();
        assert!(video_dir.join(VIDEO_FILE).exists());

        storage.delete_video(&entry.id).await.unwrap();
        assert!(!video_dir.exists());
        assert!(storage.get_video(&entry.id).await.is_none());

        let err = storage.delete_video(&entry.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_frame_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VideoStorage::open(dir.path()).await.unwrap();
        let entry = storage.create_video_entry(params("frames")).await.unwrap();
        let video_dir = storage.video_dir(&entry.id).unwrap();
        for name in ["frame_0002.png", "frame_0000.png", "thumbnail.jpg", "frame_0001.png"] {
            std::fs::write(video_dir.join(name), b"x").unwrap();
        }

        let frames = storage.frame_files(&entry.id).await.unwrap();
        let names: Vec<_> = frames
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["frame_0000.png", "frame_0001.png", "frame_0002.png"]);

        assert!(storage.frame_files(&VideoId::from("absent")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_video() {
        let dir = tempfile::tempdir().unwrap();
        let storage = VideoStorage::open(dir.path()).await.unwrap();
        let err = storage
            .update_video_frames(&VideoId::from("missing"), 3)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_corrupt_index_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(METADATA_FILE), b"{ not json").unwrap();

        let storage = VideoStorage::open(dir.path()).await.unwrap();
        assert!(storage.list_videos().await.is_empty());

        // The next write replaces the corrupt file.
        storage.create_video_entry(params("fresh")).await.unwrap();
        let reopened = VideoStorage::open(dir.path()).await.unwrap();
        assert_eq!(reopened.list_videos().await.len(), 1);
    }

    #[test]
    fn test_video_dir_rejects_traversal() {
        assert!(is_safe_id("3f2b7c1e-0000-4000-8000-000000000000"));
        assert!(!is_safe_id("../etc"));
        assert!(!is_safe_id("a/b"));
        assert!(!is_safe_id(""));
    }
}
