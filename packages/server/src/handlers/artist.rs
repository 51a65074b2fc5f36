use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    response::Response,
};
use common::storage::MediaKind;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{artist, song, song_artist};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::base_url::BaseUrl;
use crate::extractors::form::MultipartForm;
use crate::extractors::query::AppQuery;
use crate::media::serve_file;
use crate::models::artist::{
    ArtistDetail, ArtistForm, ArtistIdQuery, ArtistResponse, ArtistSummary, ArtistsResponse,
};
use crate::models::shared::{MessageResponse, missing_data, validate_name};
use crate::state::AppState;
use crate::utils::catalog;
use crate::utils::ownership::{ResourceKind, require_owner};
use crate::utils::url::media_url;

async fn owned_artist(
    state: &AppState,
    user_id: i32,
    artist_id: i32,
) -> Result<artist::Model, AppError> {
    let found = artist::Entity::find_by_id(artist_id).one(&state.db).await?;
    require_owner(user_id, found, ResourceKind::Artist)
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Artists",
    operation_id = "listArtists",
    summary = "List the caller's artists",
    description = "Ordered by number of credited songs (most first), then by name.",
    responses(
        (status = 200, description = "Artists", body = ArtistsResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn list_artists(
    auth_user: AuthUser,
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
) -> Result<Json<ArtistsResponse>, AppError> {
    let artists = artist::Entity::find()
        .filter(artist::Column::UserId.eq(auth_user.user_id))
        .all(&state.db)
        .await?;

    let durations: HashMap<i32, f64> = song::Entity::find()
        .filter(song::Column::UserId.eq(auth_user.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.duration))
        .collect();

    let mut credits: HashMap<i32, Vec<i32>> = HashMap::new();
    if !artists.is_empty() {
        let links = song_artist::Entity::find()
            .filter(song_artist::Column::ArtistId.is_in(artists.iter().map(|a| a.id)))
            .order_by_asc(song_artist::Column::SongId)
            .all(&state.db)
            .await?;
        for link in links {
            credits.entry(link.artist_id).or_default().push(link.song_id);
        }
    }

    let mut summaries: Vec<ArtistSummary> = artists
        .into_iter()
        .map(|a| {
            let songs = credits.remove(&a.id).unwrap_or_default();
            ArtistSummary {
                image: media_url(&base, MediaKind::ArtistImage, &a.image_stem),
                artist_id: a.id,
                name: a.name,
                description: a.description,
                song_count: songs.len() as i64,
                duration: songs.iter().filter_map(|id| durations.get(id)).sum(),
                songs,
            }
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.song_count
            .cmp(&a.song_count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });

    Ok(Json(ArtistsResponse {
        success: true,
        message: "Successfully retrieved artists from database".into(),
        artists: summaries,
    }))
}

#[utoipa::path(
    get,
    path = "/single",
    tag = "Artists",
    operation_id = "getArtist",
    summary = "Get an artist with their songs",
    description = "Songs are ordered by title.",
    params(ArtistIdQuery),
    responses(
        (status = 200, description = "The artist", body = ArtistResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your artist (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Artist not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, artist_id = query.artist_id))]
pub async fn get_artist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    BaseUrl(base): BaseUrl,
    AppQuery(query): AppQuery<ArtistIdQuery>,
) -> Result<Json<ArtistResponse>, AppError> {
    let existing = owned_artist(&state, auth_user.user_id, query.artist_id).await?;

    let song_ids: Vec<i32> = song_artist::Entity::find()
        .filter(song_artist::Column::ArtistId.eq(existing.id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|link| link.song_id)
        .collect();
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

    let duration = songs.iter().map(|s| s.duration).sum();
    let song_count = songs.len() as i64;
    let songs = catalog::song_views(&state.db, &base, songs).await?;

    Ok(Json(ArtistResponse {
        success: true,
        message: "Successfully retrieved artist from database".into(),
        artist: ArtistDetail {
            image: media_url(&base, MediaKind::ArtistImage, &existing.image_stem),
            artist_id: existing.id,
            name: existing.name,
            description: existing.description,
            song_count,
            duration,
            songs,
        },
    }))
}

#[utoipa::path(
    patch,
    path = "/edit",
    tag = "Artists",
    operation_id = "editArtist",
    summary = "Edit an artist",
    description = "`artistId` is required; `name`, `description` and `image` are applied when present. An empty `description` clears it.",
    request_body(content = ArtistForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Artist edited", body = MessageResponse),
        (status = 400, description = "Missing or invalid data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your artist (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Artist not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Another artist has this name (CONFLICT)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn edit_artist(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut form: MultipartForm,
) -> Result<Json<MessageResponse>, AppError> {
    let artist_id: i32 = form.parse("artistId")?.ok_or_else(missing_data)?;
    let existing = owned_artist(&state, auth_user.user_id, artist_id).await?;

    let name = form.text("name").filter(|n| !n.is_empty()).map(str::to_string);
    if let Some(name) = &name {
        validate_name(name, "Name")?;
        let clash = catalog::find_artist(&state.db, auth_user.user_id, name).await?;
        if clash.is_some_and(|other| other.id != existing.id) {
            return Err(AppError::Conflict("Artist already exists".into()));
        }
    }
    let description = form.text("description").map(str::to_string);
    let image = form.take_file("image");

    if image.is_some() {
        catalog::store_image(
            state.store.as_ref(),
            &state.converter,
            MediaKind::ArtistImage,
            &existing.image_stem,
            image,
        )
        .await?;
    }

    let mut active: artist::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(description) = description {
        active.description = Set(Some(description).filter(|d| !d.is_empty()));
    }
    if active.is_changed() {
        active.update(&state.db).await?;
    }

    Ok(Json(MessageResponse::new("Successfully edited the artist")))
}

#[utoipa::path(
    get,
    path = "/image/{filename}",
    tag = "Artists",
    operation_id = "getArtistImage",
    summary = "Get an artist image",
    params(("filename" = String, Path, description = "`<stem>.jpg` as found in an artist's `image` URL")),
    responses(
        (status = 200, description = "Artist image", content_type = "image/jpeg"),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your cover (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Cover not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip(auth_user, state), fields(user_id = auth_user.user_id))]
pub async fn get_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let found = match MediaKind::ArtistImage.stem_of(&filename) {
        Some(stem) => {
            artist::Entity::find()
                .filter(artist::Column::ImageStem.eq(stem))
                .one(&state.db)
                .await?
        }
        None => None,
    };
    let owned = require_owner(auth_user.user_id, found, ResourceKind::Cover)?;
    serve_file(
        state.store.as_ref(),
        MediaKind::ArtistImage,
        &owned.image_stem,
    )
    .await
}
