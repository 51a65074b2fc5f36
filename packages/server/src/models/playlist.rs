use serde::{Deserialize, Serialize};

use super::shared::SongView;

#[derive(Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PlaylistIdQuery {
    #[param(example = 4)]
    pub playlist_id: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistIdRequest {
    #[schema(example = 4)]
    pub playlist_id: i32,
}

/// Request body for `/playlists/add-song`.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddSongsRequest {
    pub playlist_id: i32,
    /// Songs to add. Songs already in the playlist are skipped.
    #[schema(example = json!([12, 13]))]
    pub song_ids: Vec<i32>,
}

/// Request body for `/playlists/delete-song`.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveSongRequest {
    pub playlist_id: i32,
    pub song_id: i32,
}

/// Multipart body of `/playlists/create` and `/playlists/edit`, documented for
/// OpenAPI only.
#[allow(dead_code)]
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistForm {
    /// Required on edit, ignored on create.
    pub playlist_id: Option<i32>,
    /// Required on create.
    pub name: Option<String>,
    /// An empty string clears the description.
    pub description: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub cover: Option<Vec<u8>>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    #[schema(example = 4)]
    pub playlist_id: i32,
    #[schema(example = "Road trip")]
    pub name: String,
    pub description: Option<String>,
    /// Total length in seconds.
    pub playlist_duration: f64,
    pub song_count: i64,
    pub cover: String,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    #[serde(flatten)]
    pub summary: PlaylistSummary,
    pub songs: Vec<SongView>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PlaylistsResponse {
    pub success: bool,
    pub message: String,
    pub playlists: Vec<PlaylistSummary>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PlaylistResponse {
    pub success: bool,
    pub message: String,
    pub playlist: PlaylistDetail,
}
