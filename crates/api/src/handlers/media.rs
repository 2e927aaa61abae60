//! Handlers for published clips and frames.
//!
//! File names are taken from the URL and only bare names are accepted, so a
//! request can never reach outside `videos/` or `images/`.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Largest range served when the client leaves the end open (1 MiB).
const MAX_CHUNK_SIZE: u64 = 1024 * 1024;

const CLIP_DISPOSITION: &str = "attachment; filename=accident_clip.mp4";

/// Parse a `Range: bytes=START-END` header value.
/// Returns `(start, optional_end)`. Suffix and multi-range forms are not
/// supported and yield `None`.
fn parse_range_header(range: &str) -> Option<(u64, Option<u64>)> {
    let range = range.strip_prefix("bytes=")?;
    let (start, end) = range.split_once('-')?;
    let start = start.trim().parse::<u64>().ok()?;
    let end = end.trim();
    let end = if end.is_empty() {
        None
    } else {
        Some(end.parse::<u64>().ok()?)
    };
    Some((start, end))
}

async fn open_file(path: &FsPath) -> AppResult<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();
    Ok((file, len))
}

/// Serve `path` in full, or the requested byte range when `headers` carry a
/// parseable `Range`.
async fn serve_file(
    path: &FsPath,
    content_type: &'static str,
    mut extra: HeaderMap,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let (mut file, file_size) = open_file(path).await?;

    extra.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    extra.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header);

    if let Some((start, end)) = range {
        let last = file_size.saturating_sub(1);
        let end = end
            .map(|e| e.min(last))
            .unwrap_or_else(|| start.saturating_add(MAX_CHUNK_SIZE - 1).min(last));

        if file_size == 0 || start >= file_size || start > end {
            extra.insert(
                header::CONTENT_RANGE,
                header_value(format!("bytes */{file_size}"))?,
            );
            return Ok((StatusCode::RANGE_NOT_SATISFIABLE, extra, Body::empty()).into_response());
        }

        let length = end - start + 1;
        file.seek(std::io::SeekFrom::Start(start))
            .await
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        extra.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        extra.insert(
            header::CONTENT_RANGE,
            header_value(format!("bytes {start}-{end}/{file_size}"))?,
        );
        let body = Body::from_stream(ReaderStream::new(file.take(length)));
        return Ok((StatusCode::PARTIAL_CONTENT, extra, body).into_response());
    }

    extra.insert(header::CONTENT_LENGTH, HeaderValue::from(file_size));
    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, extra, body).into_response())
}

fn header_value(value: String) -> AppResult<HeaderValue> {
    HeaderValue::try_from(value).map_err(|e| AppError::InternalError(e.to_string()))
}

/// GET /accident_video/{filename}
///
/// Serves a clip as an `video/mp4` attachment with range support.
pub async fn get_video(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let path = state
        .media
        .resolve_video(&filename)
        .await
        .ok_or(AppError::FileNotFound)?;

    let mut extra = HeaderMap::new();
    extra.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static(CLIP_DISPOSITION),
    );
    serve_file(&path, "video/mp4", extra, &headers).await
}

/// GET /accident_frame/{filename}
pub async fn get_frame(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let path = state
        .media
        .resolve_image(&filename)
        .await
        .ok_or(AppError::FileNotFound)?;

    serve_file(&path, "image/jpeg", HeaderMap::new(), &headers).await
}
