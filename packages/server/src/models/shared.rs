use chrono::{DateTime, Utc};
use common::storage::MediaKind;
use serde::{Deserialize, Serialize};

use crate::entity::song;
use crate::error::AppError;
use crate::utils::url::media_url;

/// Generic success envelope for endpoints without a payload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Successfully set queue")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// The 400 returned when a required field is absent or empty.
pub fn missing_data() -> AppError {
    AppError::Validation("Missing data".into())
}

/// Trim `value` and reject it when nothing is left.
pub fn require_text(value: Option<&str>) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(missing_data()),
    }
}

/// Validate a display name (songs, artists, playlists): 1-256 characters.
pub fn validate_name(name: &str, what: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 256 {
        return Err(AppError::Validation(format!(
            "{what} must be 1-256 characters"
        )));
    }
    Ok(())
}

/// Validate an optional release year.
pub fn validate_release_year(year: i32) -> Result<(), AppError> {
    if !(0..=9999).contains(&year) {
        return Err(AppError::Validation(
            "Release year must be between 0 and 9999".into(),
        ));
    }
    Ok(())
}

/// An artist credited on a song.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRef {
    #[schema(example = 3)]
    pub artist_id: i32,
    #[schema(example = "Daft Punk")]
    pub name: String,
}

/// A song as returned by song, playlist and artist endpoints.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongView {
    #[schema(example = 12)]
    pub song_id: i32,
    #[schema(example = "Harder, Better, Faster, Stronger")]
    pub title: String,
    pub genre: Option<String>,
    /// Length in seconds.
    #[schema(example = 224.5)]
    pub duration: f64,
    pub release_year: Option<i32>,
    pub is_favorite: bool,
    pub last_played: Option<DateTime<Utc>>,
    /// Absolute URL of the cover image.
    pub cover: String,
    /// Credited artists in credit order.
    pub artists: Vec<ArtistRef>,
}

impl SongView {
    pub fn new(base: &str, song: song::Model, artists: Vec<ArtistRef>) -> Self {
        Self {
            cover: media_url(base, MediaKind::SongCover, &song.file_stem),
            song_id: song.id,
            title: song.title,
            genre: song.genre,
            duration: song.duration,
            release_year: song.release_year,
            is_favorite: song.is_favorite,
            last_played: song.last_played,
            artists,
        }
    }
}
