//! Filesystem storage for generated videos.
//!
//! Every video owns a directory `<base>/<video_id>/` holding its frames,
//! `output.mp4` and `thumbnail.jpg`. A shared `metadata.json` index in the
//! base directory maps video ids to their entries.

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::VideoStorage;
