use serde::{Deserialize, Serialize};

use super::shared::SongView;

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ArtistIdQuery {
    #[param(example = 3)]
    pub artist_id: i32,
}

/// Multipart body of `/artists/edit`, documented for OpenAPI only.
#[allow(dead_code)]
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtistForm {
    pub artist_id: i32,
    pub name: Option<String>,
    /// An empty string clears the description.
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSummary {
    #[schema(example = 3)]
    pub artist_id: i32,
    #[schema(example = "Daft Punk")]
    pub name: String,
    pub description: Option<String>,
    pub song_count: i64,
    /// Total length of the artist's songs in seconds.
    pub duration: f64,
    pub image: String,
    /// Ids of the credited songs.
    pub songs: Vec<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtistDetail {
    pub artist_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub song_count: i64,
    pub duration: f64,
    pub image: String,
    pub songs: Vec<SongView>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ArtistsResponse {
    pub success: bool,
    pub message: String,
    pub artists: Vec<ArtistSummary>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ArtistResponse {
    pub success: bool,
    pub message: String,
    pub artist: ArtistDetail,
}
