use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::Response,
};
use chrono::Utc;
use common::storage::{MediaKind, new_stem};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{song, song_artist};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::base_url::BaseUrl;
use crate::extractors::form::MultipartForm;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::external::{TrackTags, read_tags};
use crate::media::{serve_file, stream_song};
use crate::models::shared::{
    MessageResponse, missing_data, validate_name, validate_release_year,
};
use crate::models::song::{
    BrowseQuery, BrowseResponse, BrowseSong, DownloadRequest, EditSongForm, SongIdQuery,
    SongIdRequest, SongResponse, SongsResponse,
};
use crate::state::AppState;
use crate::utils::catalog;
use crate::utils::ownership::{ResourceKind, require_owner};
use crate::utils::url::random_default_cover_url;

/// Load a song and check that the caller owns it.
async fn owned_song(state: &AppState, user_id: i32, song_id: i32) -> Result<song::Model, AppError> {
    let found = song::Entity::find_by_id(song_id).one(&state.db).await?;
    require_owner(user_id, found, ResourceKind::Song)
}

#[utoipa::path(
    get,
    path = "/play",
    tag = "Songs",
    operation_id = "playSong",
    summary = "Stream a song's audio",
    description = "Serves the audio file of a song owned by the caller. A single `bytes` range is honoured with a 206; without a `Range` header the whole file is sent.",
    params(
        SongIdQuery,
        ("Range" = Option<String>, Header, description = "Single byte range, e.g. `bytes=0-99`"),
    ),
    responses(
        (status = 200, description = "Whole file", content_type = "audio/mp4"),
        (status = 206, description = "Requested range", content_type = "audio/mp4"),
        (status = 400, description = "Malformed Range header (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Song not found (NOT_FOUND)", body = ErrorBody),
        (status = 416, description = "Range outside the file"),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, song_id = query.song_id))]
pub async fn play_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SongIdQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    // A header that is not valid text is treated like any other unparsable range.
    let range = headers
        .get(header::RANGE)
        .map(|value| value.to_str().unwrap_or_default());

    stream_song(
        state.songs.clone(),
        state.store.as_ref(),
        auth_user.user_id,
        query.song_id,
        range,
    )
    .await
}

#[utoipa::path(
    post,
    path = "/download",
    tag = "Songs",
    operation_id = "downloadSong",
    summary = "Download a song into the caller's library",
    description = "Runs the extractor on `songURL`, reads the resulting file's tags and stores the song with its artists and cover.",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "Song added", body = MessageResponse),
        (status = 400, description = "Missing data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 500, description = "Extractor failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn download_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<DownloadRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let url = payload
        .song_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(missing_data)?;

    let stem = new_stem();
    let audio_path = state.store.path(MediaKind::Audio, &stem)?;

    if let Err(e) = state.extractor.download(&url, &audio_path).await {
        catalog::discard(state.store.as_ref(), MediaKind::Audio, &stem).await;
        return Err(AppError::upstream("Error while downloading the song", e));
    }

    let tags = match read_tags(audio_path).await {
        Ok(tags) => tags,
        Err(e) => {
            catalog::discard(state.store.as_ref(), MediaKind::Audio, &stem).await;
            return Err(AppError::upstream("Error while reading metadata", e));
        }
    };

    if let Err(e) = import_song(&state, auth_user.user_id, &stem, tags).await {
        catalog::discard(state.store.as_ref(), MediaKind::Audio, &stem).await;
        catalog::discard(state.store.as_ref(), MediaKind::SongCover, &stem).await;
        return Err(e);
    }

    Ok(Json(MessageResponse::new(
        "Successfully downloaded the song and added it to account",
    )))
}

/// Write the cover for a freshly downloaded file and insert its rows.
async fn import_song(
    state: &AppState,
    user_id: i32,
    stem: &str,
    tags: TrackTags,
) -> Result<song::Model, AppError> {
    write_embedded_cover(state, stem, tags.picture, true).await?;

    let txn = state.db.begin().await?;
    let created = song::ActiveModel {
        file_stem: Set(stem.to_string()),
        title: Set(tags.title),
        genre: Set(tags.genre),
        duration: Set(tags.duration),
        release_year: Set(tags.year),
        is_favorite: Set(false),
        last_played: Set(None),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let artists =
        catalog::resolve_artists(&txn, state.store.as_ref(), user_id, &tags.artists).await?;
    catalog::credit_artists(&txn, created.id, &artists).await?;
    txn.commit().await?;

    tracing::info!(
        user_id,
        song_id = created.id,
        title = %created.title,
        "Song downloaded"
    );
    Ok(created)
}

/// Store an embedded picture as the song's cover. When there is no usable
/// picture, a stock cover is written if `fallback` is set; otherwise the
/// current cover is kept.
async fn write_embedded_cover(
    state: &AppState,
    stem: &str,
    picture: Option<Vec<u8>>,
    fallback: bool,
) -> Result<(), AppError> {
    let converted = match picture {
        Some(bytes) => match state.converter.to_jpeg(&bytes).await {
            Ok(jpeg) => Some(jpeg),
            Err(e) => {
                tracing::warn!(stem, error = %e, "Embedded cover could not be converted");
                None
            }
        },
        None => None,
    };

    match converted {
        Some(jpeg) => state.store.put(MediaKind::SongCover, stem, &jpeg).await?,
        None if fallback => state.store.put_default(MediaKind::SongCover, stem).await?,
        None => {}
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/browse",
    tag = "Songs",
    operation_id = "browseSongs",
    summary = "Search the external catalogue",
    params(BrowseQuery),
    responses(
        (status = 200, description = "Search hits", body = BrowseResponse),
        (status = 400, description = "Missing data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 500, description = "Search provider failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn browse_songs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
    AppQuery(query): AppQuery<BrowseQuery>,
) -> Result<Json<BrowseResponse>, AppError> {
    let terms = query
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(missing_data)?;

    let results = state
        .search
        .search(&terms)
        .await
        .map_err(|e| AppError::upstream("Error while getting search page", e))?;

    let songs = results
        .into_iter()
        .map(|r| BrowseSong::from_result(r, || random_default_cover_url(&base)))
        .collect();

    Ok(Json(BrowseResponse {
        success: true,
        message: "Successfully fetched songs".into(),
        songs,
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Songs",
    operation_id = "listSongs",
    summary = "List the caller's songs",
    responses(
        (status = 200, description = "Songs ordered by title", body = SongsResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn list_songs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
) -> Result<Json<SongsResponse>, AppError> {
    let songs = song::Entity::find()
        .filter(song::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(song::Column::Title)
        .order_by_asc(song::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(SongsResponse {
        success: true,
        message: "Successfully retrieved songs from database".into(),
        songs: catalog::song_views(&state.db, &base, songs).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/single",
    tag = "Songs",
    operation_id = "getSong",
    summary = "Get one of the caller's songs",
    params(SongIdQuery),
    responses(
        (status = 200, description = "The song", body = SongResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Song not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, song_id = query.song_id))]
pub async fn get_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
    AppQuery(query): AppQuery<SongIdQuery>,
) -> Result<Json<SongResponse>, AppError> {
    let found = owned_song(&state, auth_user.user_id, query.song_id).await?;
    let song = catalog::song_views(&state.db, &base, vec![found])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("song view missing".into()))?;

    Ok(Json(SongResponse {
        success: true,
        message: "Successfully retrieved song from database".into(),
        song,
    }))
}

#[utoipa::path(
    get,
    path = "/cover/{filename}",
    tag = "Songs",
    operation_id = "getSongCover",
    summary = "Get a song cover",
    params(("filename" = String, Path, description = "`<stem>.jpg` as found in a song's `cover` URL")),
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
    let found = match MediaKind::SongCover.stem_of(&filename) {
        Some(stem) => {
            song::Entity::find()
                .filter(song::Column::FileStem.eq(stem))
                .one(&state.db)
                .await?
        }
        None => None,
    };
    let owned = require_owner(auth_user.user_id, found, ResourceKind::Cover)?;
    serve_file(state.store.as_ref(), MediaKind::SongCover, &owned.file_stem).await
}

#[utoipa::path(
    patch,
    path = "/edit",
    tag = "Songs",
    operation_id = "editSong",
    summary = "Edit a song's metadata",
    description = "Every field except `songId` is optional and only applied when present. `artistAdd` and `artistDelete` are JSON arrays of artist names; added artists are created when missing.",
    request_body(content = EditSongForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Song edited", body = MessageResponse),
        (status = 400, description = "Invalid field (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Song or artist to delete not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn edit_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> Result<Json<MessageResponse>, AppError> {
    let song_id: i32 = form.parse("songId")?.ok_or_else(missing_data)?;
    let existing = owned_song(&state, auth_user.user_id, song_id).await?;

    let title = form.text("title").filter(|t| !t.is_empty()).map(str::to_string);
    if let Some(title) = &title {
        validate_name(title, "Title")?;
    }
    let genre = form.text("genre").filter(|g| !g.is_empty()).map(str::to_string);
    let release_year: Option<i32> = form.parse("releaseYear")?;
    if let Some(year) = release_year {
        validate_release_year(year)?;
    }
    let artist_add: Vec<String> = form.json("artistAdd")?.unwrap_or_default();
    let artist_delete: Vec<String> = form.json("artistDelete")?.unwrap_or_default();

    let cover = match form.take_file("cover") {
        Some(bytes) => Some(
            state
                .converter
                .to_jpeg(&bytes)
                .await
                .map_err(|e| AppError::upstream("Error while converting the image", e))?,
        ),
        None => None,
    };

    let txn = state.db.begin().await?;

    let file_stem = existing.file_stem.clone();
    let mut active: song::ActiveModel = existing.into();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if let Some(genre) = genre {
        active.genre = Set(Some(genre));
    }
    if let Some(year) = release_year {
        active.release_year = Set(Some(year));
    }
    if active.is_changed() {
        active.update(&txn).await?;
    }

    for name in &artist_delete {
        let credited = match catalog::find_artist(&txn, auth_user.user_id, name.trim()).await? {
            Some(artist) => song_artist::Entity::delete_many()
                .filter(song_artist::Column::SongId.eq(song_id))
                .filter(song_artist::Column::ArtistId.eq(artist.id))
                .exec(&txn)
                .await?
                .rows_affected
                > 0,
            None => false,
        };
        if !credited {
            return Err(AppError::NotFound("Artist to delete not found".into()));
        }
    }

    if !artist_add.is_empty() {
        let artists =
            catalog::resolve_artists(&txn, state.store.as_ref(), auth_user.user_id, &artist_add)
                .await?;
        catalog::credit_artists(&txn, song_id, &artists).await?;
    }

    let orphaned = if artist_delete.is_empty() {
        Vec::new()
    } else {
        catalog::prune_orphan_artists(&txn, auth_user.user_id).await?
    };

    txn.commit().await?;

    if let Some(jpeg) = cover {
        state
            .store
            .put(MediaKind::SongCover, &file_stem, &jpeg)
            .await?;
    }
    for stem in &orphaned {
        catalog::discard(state.store.as_ref(), MediaKind::ArtistImage, stem).await;
    }

    Ok(Json(MessageResponse::new("Successfully edited the song")))
}

#[utoipa::path(
    delete,
    path = "/delete",
    tag = "Songs",
    operation_id = "deleteSong",
    summary = "Delete a song and its files",
    request_body = SongIdRequest,
    responses(
        (status = 200, description = "Song deleted", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Song not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, song_id = payload.song_id))]
pub async fn delete_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SongIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let existing = owned_song(&state, auth_user.user_id, payload.song_id).await?;

    state
        .store
        .delete(MediaKind::Audio, &existing.file_stem)
        .await?;
    state
        .store
        .delete(MediaKind::SongCover, &existing.file_stem)
        .await?;

    let txn = state.db.begin().await?;
    catalog::delete_song_rows(&txn, existing.id).await?;
    let orphaned = catalog::prune_orphan_artists(&txn, auth_user.user_id).await?;
    txn.commit().await?;

    for stem in &orphaned {
        catalog::discard(state.store.as_ref(), MediaKind::ArtistImage, stem).await;
    }

    tracing::info!(song_id = existing.id, "Song deleted");
    Ok(Json(MessageResponse::new("Successfully deleted the song")))
}

#[utoipa::path(
    post,
    path = "/toggle-favorite",
    tag = "Songs",
    operation_id = "toggleFavorite",
    summary = "Flip a song's favourite flag",
    request_body = SongIdRequest,
    responses(
        (status = 200, description = "Toggled", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Song not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, song_id = payload.song_id))]
pub async fn toggle_favorite(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SongIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let existing = owned_song(&state, auth_user.user_id, payload.song_id).await?;

    let is_favorite = !existing.is_favorite;
    let mut active: song::ActiveModel = existing.into();
    active.is_favorite = Set(is_favorite);
    active.update(&state.db).await?;

    Ok(Json(MessageResponse::new(
        "Successfully toggled favorite on the song",
    )))
}

#[utoipa::path(
    put,
    path = "/reset",
    tag = "Songs",
    operation_id = "resetSong",
    summary = "Restore a song's metadata from its audio file",
    description = "Re-reads the tags of the stored file and replaces title, genre, year, duration, artists and, when the file embeds one, the cover.",
    request_body = SongIdRequest,
    responses(
        (status = 200, description = "Metadata reset", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Song not found (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Tags could not be read (UPSTREAM_ERROR)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, song_id = payload.song_id))]
pub async fn reset_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SongIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let existing = owned_song(&state, auth_user.user_id, payload.song_id).await?;
    let stem = existing.file_stem.clone();

    let tags = read_tags(state.store.path(MediaKind::Audio, &stem)?)
        .await
        .map_err(|e| AppError::upstream("Error while reading metadata", e))?;

    let txn = state.db.begin().await?;
    let mut active: song::ActiveModel = existing.into();
    active.title = Set(tags.title);
    active.genre = Set(tags.genre);
    active.release_year = Set(tags.year);
    active.duration = Set(tags.duration);
    active.update(&txn).await?;

    catalog::clear_credits(&txn, payload.song_id).await?;
    let artists =
        catalog::resolve_artists(&txn, state.store.as_ref(), auth_user.user_id, &tags.artists)
            .await?;
    catalog::credit_artists(&txn, payload.song_id, &artists).await?;
    let orphaned = catalog::prune_orphan_artists(&txn, auth_user.user_id).await?;
    txn.commit().await?;

    for stem in &orphaned {
        catalog::discard(state.store.as_ref(), MediaKind::ArtistImage, stem).await;
    }
    write_embedded_cover(&state, &stem, tags.picture, false).await?;

    Ok(Json(MessageResponse::new(
        "Successfully reset the song metadata",
    )))
}
