//! Range-aware audio streaming.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use chrono::Utc;
use common::range::{RangeOutcome, parse_range};
use common::storage::{MediaKind, MediaStore};
use tokio_util::io::ReaderStream;

use super::repository::SongRepository;
use crate::error::AppError;
use crate::utils::ownership::{ResourceKind, require_owner};

pub const MALFORMED_RANGE: &str = "Malformed Range header";

/// Serve a song's audio to `identity`, honouring an optional `Range` header.
///
/// Ownership is checked before anything else. A last-played update is fired
/// off in the background and never affects the response.
pub async fn stream_song(
    songs: Arc<dyn SongRepository>,
    store: &dyn MediaStore,
    identity: i32,
    song_id: i32,
    range: Option<&str>,
) -> Result<Response, AppError> {
    let found = songs.find_owned(song_id).await?;
    let media = require_owner(identity, found, ResourceKind::Song)?;

    spawn_touch(songs, song_id);

    let total = store.size(MediaKind::Audio, &media.file_stem).await?;

    let (status, start, len, content_range) = match parse_range(range, total) {
        RangeOutcome::NoRange => (StatusCode::OK, 0, total, None),
        RangeOutcome::Satisfiable(window) => (
            StatusCode::PARTIAL_CONTENT,
            window.start,
            window.len(),
            Some(window.content_range(total)),
        ),
        RangeOutcome::Unsatisfiable => return Err(AppError::RangeNotSatisfiable { total }),
        RangeOutcome::Malformed => return Err(AppError::Validation(MALFORMED_RANGE.into())),
    };

    let reader = store
        .open_range(MediaKind::Audio, &media.file_stem, start, len)
        .await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, MediaKind::Audio.content_type())
        .header(header::CONTENT_LENGTH, len.to_string())
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(content_range) = content_range {
        builder = builder.header(header::CONTENT_RANGE, content_range);
    }

    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Serve a whole stored image with its kind's content type.
pub async fn serve_file(
    store: &dyn MediaStore,
    kind: MediaKind,
    stem: &str,
) -> Result<Response, AppError> {
    let total = store.size(kind, stem).await?;
    let reader = store.open_range(kind, stem, 0, total).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, kind.content_type())
        .header(header::CONTENT_LENGTH, total.to_string())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Record the play time without holding up the stream.
fn spawn_touch(songs: Arc<dyn SongRepository>, song_id: i32) {
    tokio::spawn(async move {
        if let Err(e) = songs.touch_last_played(song_id, Utc::now()).await {
            tracing::warn!(song_id, error = %e, "Failed to update last played timestamp");
        }
    });
}
