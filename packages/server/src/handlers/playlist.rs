use std::collections::{HashMap, HashSet};

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use chrono::Utc;
use common::storage::{MediaKind, new_stem};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{playlist, playlist_song, song};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::base_url::BaseUrl;
use crate::extractors::form::MultipartForm;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::media::serve_file;
use crate::models::playlist::{
    AddSongsRequest, PlaylistDetail, PlaylistForm, PlaylistIdQuery, PlaylistIdRequest,
    PlaylistResponse, PlaylistSummary, PlaylistsResponse, RemoveSongRequest,
};
use crate::models::shared::{MessageResponse, missing_data, validate_name};
use crate::state::AppState;
use crate::utils::catalog;
use crate::utils::ownership::{ResourceKind, require_owner};
use crate::utils::url::media_url;

async fn owned_playlist(
    state: &AppState,
    user_id: i32,
    playlist_id: i32,
) -> Result<playlist::Model, AppError> {
    let found = playlist::Entity::find_by_id(playlist_id)
        .one(&state.db)
        .await?;
    require_owner(user_id, found, ResourceKind::Playlist)
}

/// Ids of the songs in each of `playlist_ids`.
async fn members<C: ConnectionTrait>(
    db: &C,
    playlist_ids: Vec<i32>,
) -> Result<HashMap<i32, Vec<i32>>, DbErr> {
    let mut by_playlist: HashMap<i32, Vec<i32>> = HashMap::new();
    if playlist_ids.is_empty() {
        return Ok(by_playlist);
    }
    let entries = playlist_song::Entity::find()
        .filter(playlist_song::Column::PlaylistId.is_in(playlist_ids))
        .order_by_asc(playlist_song::Column::AddedAt)
        .all(db)
        .await?;
    for entry in entries {
        by_playlist
            .entry(entry.playlist_id)
            .or_default()
            .push(entry.song_id);
    }
    Ok(by_playlist)
}

fn summary(base: &str, playlist: playlist::Model, songs: &[&song::Model]) -> PlaylistSummary {
    PlaylistSummary {
        cover: media_url(base, MediaKind::PlaylistCover, &playlist.cover_stem),
        playlist_id: playlist.id,
        name: playlist.name,
        description: playlist.description,
        playlist_duration: songs.iter().map(|s| s.duration).sum(),
        song_count: songs.len() as i64,
    }
}

#[utoipa::path(
    post,
    path = "/create",
    tag = "Playlists",
    operation_id = "createPlaylist",
    summary = "Create a playlist",
    description = "`name` is required. Without a `cover` upload a stock cover is used.",
    request_body(content = PlaylistForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Playlist created", body = MessageResponse),
        (status = 400, description = "Missing or invalid data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn create_playlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> Result<Json<MessageResponse>, AppError> {
    let name = form.require("name")?.to_string();
    validate_name(&name, "Name")?;
    let description = form
        .text("description")
        .filter(|d| !d.is_empty())
        .map(str::to_string);

    let stem = new_stem();
    catalog::store_image(
        state.store.as_ref(),
        &state.converter,
        MediaKind::PlaylistCover,
        &stem,
        form.take_file("cover"),
    )
    .await?;

    let inserted = playlist::ActiveModel {
        name: Set(name),
        description: Set(description),
        cover_stem: Set(stem.clone()),
        user_id: Set(auth_user.user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await;

    match inserted {
        Ok(created) => {
            tracing::info!(playlist_id = created.id, "Playlist created");
            Ok(Json(MessageResponse::new("Successfully created playlist")))
        }
        Err(e) => {
            catalog::discard(state.store.as_ref(), MediaKind::PlaylistCover, &stem).await;
            Err(e.into())
        }
    }
}

#[utoipa::path(
    patch,
    path = "/edit",
    tag = "Playlists",
    operation_id = "editPlaylist",
    summary = "Edit a playlist",
    description = "`playlistId` is required; `name`, `description` and `cover` are applied when present. An empty `description` clears it.",
    request_body(content = PlaylistForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Playlist edited", body = MessageResponse),
        (status = 400, description = "Missing or invalid data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your playlist (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Playlist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn edit_playlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> Result<Json<MessageResponse>, AppError> {
    let playlist_id: i32 = form.parse("playlistId")?.ok_or_else(missing_data)?;
    let existing = owned_playlist(&state, auth_user.user_id, playlist_id).await?;

    let name = form.text("name").filter(|n| !n.is_empty()).map(str::to_string);
    if let Some(name) = &name {
        validate_name(name, "Name")?;
    }
    let description = form.text("description").map(str::to_string);
    let cover = form.take_file("cover");

    if cover.is_some() {
        catalog::store_image(
            state.store.as_ref(),
            &state.converter,
            MediaKind::PlaylistCover,
            &existing.cover_stem,
            cover,
        )
        .await?;
    }

    let mut active: playlist::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(description) = description {
        active.description = Set(Some(description).filter(|d| !d.is_empty()));
    }
    if active.is_changed() {
        active.update(&state.db).await?;
    }

    Ok(Json(MessageResponse::new("Successfully edited the playlist")))
}

#[utoipa::path(
    delete,
    path = "/delete",
    tag = "Playlists",
    operation_id = "deletePlaylist",
    summary = "Delete a playlist",
    description = "The songs themselves are kept.",
    request_body = PlaylistIdRequest,
    responses(
        (status = 200, description = "Playlist deleted", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your playlist (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Playlist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, playlist_id = payload.playlist_id))]
pub async fn delete_playlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<PlaylistIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let existing = owned_playlist(&state, auth_user.user_id, payload.playlist_id).await?;

    let txn = state.db.begin().await?;
    playlist_song::Entity::delete_many()
        .filter(playlist_song::Column::PlaylistId.eq(existing.id))
        .exec(&txn)
        .await?;
    playlist::Entity::delete_by_id(existing.id).exec(&txn).await?;
    txn.commit().await?;

    catalog::discard(
        state.store.as_ref(),
        MediaKind::PlaylistCover,
        &existing.cover_stem,
    )
    .await;

    Ok(Json(MessageResponse::new("Successfully deleted the playlist")))
}

#[utoipa::path(
    post,
    path = "/add-song",
    tag = "Playlists",
    operation_id = "addSongsToPlaylist",
    summary = "Add songs to a playlist",
    description = "Every song must belong to the caller. Songs already in the playlist are skipped.",
    request_body = AddSongsRequest,
    responses(
        (status = 200, description = "Songs added", body = MessageResponse),
        (status = 400, description = "Missing data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your playlist or song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Playlist or song not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, playlist_id = payload.playlist_id))]
pub async fn add_songs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<AddSongsRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let existing = owned_playlist(&state, auth_user.user_id, payload.playlist_id).await?;

    let wanted: HashSet<i32> = payload.song_ids.iter().copied().collect();
    if wanted.is_empty() {
        return Err(missing_data());
    }

    let songs = song::Entity::find()
        .filter(song::Column::Id.is_in(wanted.iter().copied()))
        .all(&state.db)
        .await?;
    if songs.len() < wanted.len() {
        return Err(AppError::NotFound("Song not found".into()));
    }
    if songs.iter().any(|s| s.user_id != auth_user.user_id) {
        return Err(AppError::Forbidden("Not your song".into()));
    }

    let mut present: HashSet<i32> = playlist_song::Entity::find()
        .filter(playlist_song::Column::PlaylistId.eq(existing.id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|e| e.song_id)
        .collect();

    let now = Utc::now();
    let mut new_entries = Vec::new();
    for song_id in payload.song_ids {
        if present.insert(song_id) {
            new_entries.push(playlist_song::ActiveModel {
                playlist_id: Set(existing.id),
                song_id: Set(song_id),
                added_at: Set(now),
            });
        }
    }

    if !new_entries.is_empty() {
        playlist_song::Entity::insert_many(new_entries)
            .exec_without_returning(&state.db)
            .await?;
    }

    Ok(Json(MessageResponse::new(
        "Successfully added songs to playlist",
    )))
}

#[utoipa::path(
    delete,
    path = "/delete-song",
    tag = "Playlists",
    operation_id = "removeSongFromPlaylist",
    summary = "Remove a song from a playlist",
    request_body = RemoveSongRequest,
    responses(
        (status = 200, description = "Song removed", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your playlist or song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Playlist or song not found, or song not in playlist (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, playlist_id = payload.playlist_id, song_id = payload.song_id))]
pub async fn remove_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RemoveSongRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let existing = owned_playlist(&state, auth_user.user_id, payload.playlist_id).await?;
    let found = song::Entity::find_by_id(payload.song_id)
        .one(&state.db)
        .await?;
    require_owner(auth_user.user_id, found, ResourceKind::Song)?;

    let removed = playlist_song::Entity::delete_many()
        .filter(playlist_song::Column::PlaylistId.eq(existing.id))
        .filter(playlist_song::Column::SongId.eq(payload.song_id))
        .exec(&state.db)
        .await?;
    if removed.rows_affected == 0 {
        return Err(AppError::NotFound("Song is not in playlist".into()));
    }

    Ok(Json(MessageResponse::new(
        "Successfully deleted song from playlist",
    )))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Playlists",
    operation_id = "listPlaylists",
    summary = "List the caller's playlists",
    description = "Summaries ordered by name, without songs.",
    responses(
        (status = 200, description = "Playlists", body = PlaylistsResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn list_playlists(
    auth_user: AuthUser,
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
) -> Result<Json<PlaylistsResponse>, AppError> {
    let playlists = playlist::Entity::find()
        .filter(playlist::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(playlist::Column::Name)
        .order_by_asc(playlist::Column::Id)
        .all(&state.db)
        .await?;

    let members = members(&state.db, playlists.iter().map(|p| p.id).collect()).await?;
    let songs: HashMap<i32, song::Model> = song::Entity::find()
        .filter(song::Column::UserId.eq(auth_user.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let playlists = playlists
        .into_iter()
        .map(|p| {
            let entries: Vec<&song::Model> = members
                .get(&p.id)
                .map(|ids| ids.iter().filter_map(|id| songs.get(id)).collect())
                .unwrap_or_default();
            summary(&base, p, &entries)
        })
        .collect();

    Ok(Json(PlaylistsResponse {
        success: true,
        message: "Successfully retrieved playlists from database".into(),
        playlists,
    }))
}

#[utoipa::path(
    get,
    path = "/single",
    tag = "Playlists",
    operation_id = "getPlaylist",
    summary = "Get a playlist with its songs",
    description = "Songs are ordered by title.",
    params(PlaylistIdQuery),
    responses(
        (status = 200, description = "The playlist", body = PlaylistResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your playlist (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Playlist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, playlist_id = query.playlist_id))]
pub async fn get_playlist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
    AppQuery(query): AppQuery<PlaylistIdQuery>,
) -> Result<Json<PlaylistResponse>, AppError> {
    let existing = owned_playlist(&state, auth_user.user_id, query.playlist_id).await?;

    let song_ids = members(&state.db, vec![existing.id])
        .await?
        .remove(&existing.id)
        .unwrap_or_default();
    let songs = if song_ids.is_empty() {
        Vec::new()
    } else {
        song::Entity::find()
            .filter(song::Column::Id.is_in(song_ids))
            .order_by_asc(song::Column::Title)
            .order_by_asc(song::Column::Id)
            .all(&state.db)
            .await?
    };

    let summary = summary(&base, existing, &songs.iter().collect::<Vec<_>>());
    let songs = catalog::song_views(&state.db, &base, songs).await?;

    Ok(Json(PlaylistResponse {
        success: true,
        message: "Successfully retrieved playlist from database".into(),
        playlist: PlaylistDetail { summary, songs },
    }))
}

#[utoipa::path(
    get,
    path = "/cover/{filename}",
    tag = "Playlists",
    operation_id = "getPlaylistCover",
    summary = "Get a playlist cover",
    params(("filename" = String, Path, description = "`<stem>.jpg` as found in a playlist's `cover` URL")),
    responses(
        (status = 200, description = "Cover image", content_type = "image/jpeg"),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your cover (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Cover not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip(auth_user, state), fields(user_id = auth_user.user_id))]
pub async fn get_cover(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let found = match MediaKind::PlaylistCover.stem_of(&filename) {
        Some(stem) => {
            playlist::Entity::find()
                .filter(playlist::Column::CoverStem.eq(stem))
                .one(&state.db)
                .await?
        }
        None => None,
    };
    let owned = require_owner(auth_user.user_id, found, ResourceKind::Cover)?;
    serve_file(
        state.store.as_ref(),
        MediaKind::PlaylistCover,
        &owned.cover_stem,
    )
    .await
}
