//! Video library handlers.

use std::io::SeekFrom;
use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};
use ttg_media::{create_thumbnail, frames_to_mp4, write_fallback_thumbnail, OUTPUT_FILE, THUMBNAIL_FILE};
use ttg_models::{VideoEntry, VideoId};

use crate::error::{ApiError, ApiResult};
use crate::security::is_valid_id;
use crate::state::AppState;

pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<VideoEntry>> {
    Json(state.storage.list_videos().await)
}

pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<VideoEntry>> {
    Ok(Json(find_video(&state, &video_id).await?))
}

#[derive(Debug, Serialize)]
pub struct DeleteVideoResponse {
    pub ok: bool,
    pub id: VideoId,
}

pub async fn delete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Json<DeleteVideoResponse>> {
    let entry = find_video(&state, &video_id).await?;
    match state.storage.delete_video(&entry.id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Err(ApiError::not_found("Video not found")),
        Err(e) => return Err(e.into()),
    }

    info!(video_id = %entry.id, "Video deleted");
    Ok(Json(DeleteVideoResponse {
        ok: true,
        id: entry.id,
    }))
}

/// Serve `output.mp4`, stitching it from frames first when needed.
pub async fn get_video_file(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let entry = find_video(&state, &video_id).await?;
    let dir = state.storage.video_dir(&entry.id)?;
    let path = dir.join(OUTPUT_FILE);

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        if state.storage.frame_files(&entry.id).await?.is_empty() {
            return Err(ApiError::not_found("No frames found for this video"));
        }
        if let Err(e) = frames_to_mp4(&dir, entry.params.fps).await {
            error!(video_id = %entry.id, "Failed to stitch video on request: {}", e);
            return Err(ApiError::internal("Failed to create video file"));
        }
    }

    let read_failed = |e: std::io::Error| {
        error!(video_id = %entry.id, "Failed to read video file: {}", e);
        ApiError::internal("Failed to read video file")
    };
    let file_size = tokio::fs::metadata(&path).await.map_err(read_failed)?.len();

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_byte_range(v, file_size))
        .unwrap_or(ByteRange::Full);

    let body = match range {
        ByteRange::Full => file_body(&path, 0, file_size).await,
        ByteRange::Partial(start, end) => file_body(&path, start, end - start + 1).await,
        ByteRange::Unsatisfiable => Ok(Body::empty()),
    }
    .map_err(read_failed)?;

    let disposition = format!("attachment; filename=\"video_{}.mp4\"", entry.id);
    Ok(video_response(body, range, file_size, &disposition))
}

/// Stream `length` bytes of `path` starting at `start`.
async fn file_body(path: &FsPath, start: u64, length: u64) -> std::io::Result<Body> {
    let mut file = tokio::fs::File::open(path).await?;
    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    Ok(Body::from_stream(ReaderStream::new(file.take(length))))
}

/// Serve `thumbnail.jpg`, creating it (or a gray stand-in) when missing.
pub async fn get_thumbnail(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Response> {
    let entry = find_video(&state, &video_id).await?;
    let dir = state.storage.video_dir(&entry.id)?;
    let path = dir.join(THUMBNAIL_FILE);

    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        if let Err(e) = create_thumbnail(&dir).await {
            warn!(video_id = %entry.id, "Using fallback thumbnail: {}", e);
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to create thumbnail: {}", e)))?;
            write_fallback_thumbnail(&path)
                .await
                .map_err(|e| ApiError::internal(format!("Failed to create thumbnail: {}", e)))?;
        }
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read thumbnail: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response())
}

async fn find_video(state: &AppState, video_id: &str) -> ApiResult<VideoEntry> {
    if !is_valid_id(video_id) {
        return Err(ApiError::not_found("Video not found"));
    }
    state
        .storage
        .get_video(&VideoId::from(video_id))
        .await
        .ok_or_else(|| ApiError::not_found("Video not found"))
}

/// Outcome of interpreting a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteRange {
    Full,
    /// Inclusive byte offsets
    Partial(u64, u64),
    Unsatisfiable,
}

/// Parse a single `bytes=` range. Multi-range and malformed headers fall
/// back to the full body.
fn parse_byte_range(value: &str, len: u64) -> ByteRange {
    let Some(spec) = value.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = spec.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    let range = match (start.is_empty(), end.is_empty()) {
        // bytes=-N: the last N bytes
        (true, false) => match end.parse::<u64>() {
            Ok(0) => return ByteRange::Unsatisfiable,
            Ok(n) => (len.saturating_sub(n), len.saturating_sub(1)),
            Err(_) => return ByteRange::Full,
        },
        (false, true) => match start.parse::<u64>() {
            Ok(s) => (s, len.saturating_sub(1)),
            Err(_) => return ByteRange::Full,
        },
        (false, false) => match (start.parse::<u64>(), end.parse::<u64>()) {
            (Ok(s), Ok(e)) if s <= e => (s, e.min(len.saturating_sub(1))),
            (Ok(_), Ok(_)) => return ByteRange::Unsatisfiable,
            _ => return ByteRange::Full,
        },
        (true, true) => return ByteRange::Full,
    };

    if len == 0 || range.0 >= len {
        ByteRange::Unsatisfiable
    } else {
        ByteRange::Partial(range.0, range.1)
    }
}

/// Wrap a body already cut to `range` with the video headers.
fn video_response(body: Body, range: ByteRange, file_size: u64, disposition: &str) -> Response {
    let (status, content_length, content_range) = match range {
        ByteRange::Full => (StatusCode::OK, file_size, None),
        ByteRange::Partial(start, end) => (
            StatusCode::PARTIAL_CONTENT,
            end - start + 1,
            Some(format!("bytes {}-{}/{}", start, end, file_size)),
        ),
        ByteRange::Unsatisfiable => (
            StatusCode::RANGE_NOT_SATISFIABLE,
            0,
            Some(format!("bytes */{}", file_size)),
        ),
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Ok(value) = HeaderValue::from_str(disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if let Some(value) = content_range.and_then(|v| HeaderValue::from_str(&v).ok()) {
        headers.insert(header::CONTENT_RANGE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_range() {
        assert_eq!(parse_byte_range("bytes=0-99", 1000), ByteRange::Partial(0, 99));
        assert_eq!(parse_byte_range("bytes=900-", 1000), ByteRange::Partial(900, 999));
        assert_eq!(parse_byte_range("bytes=-100", 1000), ByteRange::Partial(900, 999));
        assert_eq!(parse_byte_range("bytes=500-5000", 1000), ByteRange::Partial(500, 999));
        assert_eq!(parse_byte_range("bytes=-5000", 1000), ByteRange::Partial(0, 999));
        assert_eq!(parse_byte_range("bytes=1000-", 1000), ByteRange::Unsatisfiable);
        assert_eq!(parse_byte_range("bytes=5-1", 1000), ByteRange::Unsatisfiable);
        assert_eq!(parse_byte_range("bytes=0-1,5-6", 1000), ByteRange::Full);
        assert_eq!(parse_byte_range("items=0-1", 1000), ByteRange::Full);
        assert_eq!(parse_byte_range("bytes=abc-", 1000), ByteRange::Full);
    }

    #[test]
    fn test_partial_response_headers() {
        let response = video_response(Body::empty(), ByteRange::Partial(2, 5), 10, "attachment");
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 2-5/10");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");

        let response = video_response(Body::empty(), ByteRange::Unsatisfiable, 0, "attachment");
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */0");
    }

    #[tokio::test]
    async fn test_file_body_streams_requested_slice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OUTPUT_FILE);
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let body = file_body(&path, 3, 4).await.unwrap();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"3456");

        let body = file_body(&path, 0, 10).await.unwrap();
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"0123456789");
    }
}
