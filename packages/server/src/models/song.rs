use serde::{Deserialize, Serialize};

use super::shared::SongView;
use crate::external::SearchResult;

/// Query for endpoints addressing one song.
#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SongIdQuery {
    #[param(example = 12)]
    pub song_id: i32,
}

/// Body for endpoints addressing one song.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongIdRequest {
    #[schema(example = 12)]
    pub song_id: i32,
}

/// Request body for `/songs/download`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct DownloadRequest {
    /// Page URL handed to the extractor.
    #[serde(rename = "songURL")]
    #[schema(example = "https://soundcloud.com/artist/track")]
    pub song_url: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BrowseQuery {
    /// Free-text search terms.
    pub query: Option<String>,
}

/// A search hit from the external provider.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BrowseSong {
    pub title: String,
    pub artist: String,
    pub genre: String,
    /// Page URL, suitable for `/songs/download`.
    pub url: String,
    pub cover: String,
}

impl BrowseSong {
    /// Fill a missing cover with `fallback_cover`.
    pub fn from_result(result: SearchResult, fallback_cover: impl FnOnce() -> String) -> Self {
        Self {
            cover: result.cover.unwrap_or_else(fallback_cover),
            title: result.title,
            artist: result.artist,
            genre: result.genre,
            url: result.url,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BrowseResponse {
    pub success: bool,
    pub message: String,
    pub songs: Vec<BrowseSong>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SongResponse {
    pub success: bool,
    pub message: String,
    pub song: SongView,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SongsResponse {
    pub success: bool,
    pub message: String,
    pub songs: Vec<SongView>,
}

/// Multipart body of `/songs/edit`, documented for OpenAPI only.
#[allow(dead_code)]
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditSongForm {
    pub song_id: i32,
    pub title: Option<String>,
    pub genre: Option<String>,
    pub release_year: Option<i32>,
    /// JSON array of artist names to credit.
    #[schema(example = r#"["Daft Punk"]"#)]
    pub artist_add: Option<String>,
    /// JSON array of credited artist names to remove.
    pub artist_delete: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub cover: Option<Vec<u8>>,
}
