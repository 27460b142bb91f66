//! Frame sequences on disk: listing, parallel saving, stitching and extraction.

use std::path::{Path, PathBuf};

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Name of the stitched video inside a video directory.
pub const OUTPUT_FILE: &str = "output.mp4";

/// printf-style pattern understood by FFmpeg's image2 demuxer/muxer.
const FRAME_PATTERN: &str = "frame_%04d.png";

/// Stitching a few hundred small frames never takes this long.
const FFMPEG_TIMEOUT_SECS: u64 = 300;

/// File name of the frame at `index`.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:04}.png", index)
}

fn is_frame_file(name: &str) -> bool {
    name.starts_with("frame_") && name.ends_with(".png")
}

/// Frame files in `dir`, sorted by name.
pub async fn list_frames(dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut frames = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(frames),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_str().map(is_frame_file).unwrap_or(false) {
            frames.push(entry.path());
        }
    }
    frames.sort();
    Ok(frames)
}

/// Write frames as `frame_NNNN.png` using at most `max_writers` threads.
///
/// Frames that fail to encode are logged and skipped; the number written is returned.
pub async fn save_frames(dir: &Path, frames: Vec<RgbImage>, max_writers: usize) -> MediaResult<u32> {
    tokio::fs::create_dir_all(dir).await?;
    let target = dir.to_path_buf();

    let saved = tokio::task::spawn_blocking(move || -> MediaResult<u32> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_writers.max(1))
            .build()
            .map_err(|e| MediaError::internal(format!("frame writer pool: {e}")))?;

        let saved = pool.install(|| {
            frames
                .par_iter()
                .enumerate()
                .filter(|(i, frame)| {
                    let path = target.join(frame_file_name(*i));
                    match frame.save(&path) {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(path = %path.display(), "Failed to save frame: {}", e);
                            false
                        }
                    }
                })
                .count()
        });
        Ok(saved as u32)
    })
    .await??;

    debug!(dir = %dir.display(), saved, "Saved frames");
    Ok(saved)
}

/// Stitch the frames in `dir` into `output.mp4` at `fps`.
///
/// The video is encoded to a temporary file and renamed into place, so a
/// failed run never leaves a truncated `output.mp4` behind.
pub async fn frames_to_mp4(dir: &Path, fps: u32) -> MediaResult<PathBuf> {
    let frames = list_frames(dir).await?;
    if frames.is_empty() {
        return Err(MediaError::NoFrames(dir.to_path_buf()));
    }

    let output = dir.join(OUTPUT_FILE);
    let partial = dir.join("output.partial.mp4");

    let cmd = stitch_command(dir, &partial, fps);
    if let Err(e) = FfmpegRunner::new().with_timeout(FFMPEG_TIMEOUT_SECS).run(&cmd).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e);
    }
    tokio::fs::rename(&partial, &output).await?;

    info!(frames = frames.len(), fps, path = %output.display(), "Stitched video");
    Ok(output)
}

fn stitch_command(dir: &Path, output: &Path, fps: u32) -> FfmpegCommand {
    FfmpegCommand::new(dir.join(FRAME_PATTERN), output)
        .input_frame_rate(fps.max(1))
        .video_codec("libx264")
        .pixel_format("yuv420p")
        // yuv420p needs even dimensions
        .video_filter("scale=trunc(iw/2)*2:trunc(ih/2)*2")
        .output_arg("-movflags")
        .output_arg("+faststart")
}

/// Extract frames from `output.mp4` in `dir`, resampled to `fps`.
///
/// Returns the number of frames written.
pub async fn extract_frames(dir: &Path, fps: u32) -> MediaResult<u32> {
    let input = dir.join(OUTPUT_FILE);
    if !tokio::fs::try_exists(&input).await? {
        return Err(MediaError::FileNotFound(input));
    }

    let cmd = FfmpegCommand::new(&input, dir.join(FRAME_PATTERN))
        .video_filter(format!("fps={}", fps.max(1)))
        .start_number(0);
    FfmpegRunner::new().with_timeout(FFMPEG_TIMEOUT_SECS).run(&cmd).await?;

    let count = list_frames(dir).await?.len() as u32;
    info!(frames = count, fps, "Extracted frames");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_frame_file_name() {
        assert_eq!(frame_file_name(0), "frame_0000.png");
        assert_eq!(frame_file_name(42), "frame_0042.png");
        assert!(is_frame_file("frame_0001.png"));
        assert!(!is_frame_file("thumbnail.jpg"));
        assert!(!is_frame_file("frame_0001.jpg"));
    }

    #[test]
    fn test_stitch_command_uses_pattern_and_rate() {
        let cmd = stitch_command(Path::new("/v/abc"), Path::new("/v/abc/out.mp4"), 12);
        let args = cmd.build_args();
        assert!(args.contains(&"/v/abc/frame_%04d.png".to_string()));
        assert!(args.contains(&"12".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[tokio::test]
    async fn test_save_and_list_frames() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<RgbImage> = (0..5)
            .map(|i| RgbImage::from_pixel(16, 8, Rgb([i * 10, 0, 0])))
            .collect();

        let saved = save_frames(dir.path(), frames, 2).await.unwrap();
        assert_eq!(saved, 5);

        tokio::fs::write(dir.path().join("notes.txt"), b"x").await.unwrap();
        let listed = list_frames(dir.path()).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed[0].ends_with("frame_0000.png"));
        assert!(listed[4].ends_with("frame_0004.png"));
    }

    #[tokio::test]
    async fn test_list_frames_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let listed = list_frames(&dir.path().join("missing")).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_stitch_without_frames_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = frames_to_mp4(dir.path(), 8).await.unwrap_err();
        assert!(matches!(err, MediaError::NoFrames(_)));
    }

    #[tokio::test]
    async fn test_extract_without_video_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_frames(dir.path(), 8).await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
