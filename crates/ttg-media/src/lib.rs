//! FFmpeg CLI wrapper and frame processing for generated videos.
//!
//! This crate provides:
//! - FFmpeg command building and execution
//! - Frame sequence stitching and extraction
//! - Thumbnail rendering
//! - Placeholder frame synthesis

pub mod command;
pub mod error;
pub mod frames;
pub mod placeholder;
pub mod thumbnail;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frames, frame_file_name, frames_to_mp4, list_frames, save_frames, OUTPUT_FILE};
pub use image::{Rgb, RgbImage};
pub use placeholder::create_placeholder_frames;
pub use thumbnail::{create_thumbnail, write_fallback_thumbnail, THUMBNAIL_FILE};
