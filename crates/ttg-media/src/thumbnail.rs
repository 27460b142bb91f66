//! Thumbnail rendering.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, Rgb, RgbImage};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::frames::list_frames;

/// Name of the thumbnail inside a video directory.
pub const THUMBNAIL_FILE: &str = "thumbnail.jpg";

const THUMBNAIL_WIDTH: u32 = 300;
const THUMBNAIL_HEIGHT: u32 = 200;
const JPEG_QUALITY: u8 = 85;
const FALLBACK_GRAY: u8 = 128;

/// Render `thumbnail.jpg` in `dir` from the first frame.
pub async fn create_thumbnail(dir: &Path) -> MediaResult<PathBuf> {
    let first = list_frames(dir)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::NoFrames(dir.to_path_buf()))?;
    let output = dir.join(THUMBNAIL_FILE);

    let out = output.clone();
    tokio::task::spawn_blocking(move || render_thumbnail(&first, &out)).await??;

    debug!(path = %output.display(), "Created thumbnail");
    Ok(output)
}

/// Write a solid gray thumbnail, used when a video has no frames.
pub async fn write_fallback_thumbnail(path: &Path) -> MediaResult<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let img = RgbImage::from_pixel(
            THUMBNAIL_WIDTH,
            THUMBNAIL_HEIGHT,
            Rgb([FALLBACK_GRAY, FALLBACK_GRAY, FALLBACK_GRAY]),
        );
        write_jpeg(&img, &path)
    })
    .await?
}

fn render_thumbnail(frame: &Path, output: &Path) -> MediaResult<()> {
    let img = image::open(frame)?;
    // Shrink to fit, never enlarge.
    let img = if img.width() > THUMBNAIL_WIDTH || img.height() > THUMBNAIL_HEIGHT {
        img.resize(THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT, FilterType::Lanczos3)
    } else {
        img
    };
    write_jpeg(&img.to_rgb8(), output)
}

fn write_jpeg(img: &RgbImage, path: &Path) -> MediaResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    encoder.encode(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[tokio::test]
    async fn test_thumbnail_fits_bounds() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(640, 480, Rgb([200, 10, 10]))
            .save(dir.path().join("frame_0000.png"))
            .unwrap();
        RgbImage::from_pixel(640, 480, Rgb([10, 200, 10]))
            .save(dir.path().join("frame_0001.png"))
            .unwrap();

        let path = create_thumbnail(dir.path()).await.unwrap();
        let thumb = image::open(&path).unwrap();
        let (w, h) = thumb.dimensions();
        assert!(w <= THUMBNAIL_WIDTH && h <= THUMBNAIL_HEIGHT);
        // aspect ratio preserved: 4:3 into 300x200 gives 267x200
        assert_eq!(h, 200);
        // taken from the first (red) frame
        let px = thumb.to_rgb8().get_pixel(w / 2, h / 2).0;
        assert!(px[0] > 150 && px[1] < 80);
    }

    #[tokio::test]
    async fn test_thumbnail_requires_frames() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_thumbnail(dir.path()).await.unwrap_err();
        assert!(matches!(err, MediaError::NoFrames(_)));
    }

    #[tokio::test]
    async fn test_fallback_thumbnail_is_gray() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(THUMBNAIL_FILE);
        write_fallback_thumbnail(&path).await.unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT));
        let px = img.get_pixel(10, 10).0;
        assert!(px.iter().all(|c| (*c as i32 - FALLBACK_GRAY as i32).abs() <= 3));
    }
}
