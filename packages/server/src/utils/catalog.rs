//! Shared library operations: artist credits, song views, cover files and
//! cascading deletes.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use common::storage::{MediaKind, MediaStore, new_stem};
use sea_orm::sea_query::{Expr, Func, Query};
use sea_orm::*;

use crate::entity::{
    artist, one_time_password, playlist, playlist_song, queued_song, session, song, song_artist,
    user,
};
use crate::error::AppError;
use crate::external::ImageConverter;
use crate::models::shared::{ArtistRef, SongView};

/// Build views for `songs`, keeping their order and attaching credited
/// artists in credit order.
pub async fn song_views<C: ConnectionTrait>(
    db: &C,
    base: &str,
    songs: Vec<song::Model>,
) -> Result<Vec<SongView>, DbErr> {
    if songs.is_empty() {
        return Ok(Vec::new());
    }
    let song_ids: Vec<i32> = songs.iter().map(|s| s.id).collect();

    let credits = song_artist::Entity::find()
        .filter(song_artist::Column::SongId.is_in(song_ids))
        .order_by_asc(song_artist::Column::Position)
        .all(db)
        .await?;

    let artist_ids: HashSet<i32> = credits.iter().map(|c| c.artist_id).collect();
    let names: HashMap<i32, String> = artist::Entity::find()
        .filter(artist::Column::Id.is_in(artist_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();

    let mut by_song: HashMap<i32, Vec<ArtistRef>> = HashMap::new();
    for credit in credits {
        if let Some(name) = names.get(&credit.artist_id) {
            by_song.entry(credit.song_id).or_default().push(ArtistRef {
                artist_id: credit.artist_id,
                name: name.clone(),
            });
        }
    }

    Ok(songs
        .into_iter()
        .map(|s| {
            let artists = by_song.remove(&s.id).unwrap_or_default();
            SongView::new(base, s, artists)
        })
        .collect())
}

/// Case-insensitive lookup of one of `user_id`'s artists.
pub async fn find_artist<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    name: &str,
) -> Result<Option<artist::Model>, DbErr> {
    artist::Entity::find()
        .filter(artist::Column::UserId.eq(user_id))
        .filter(Expr::expr(Func::lower(Expr::col(artist::Column::Name))).eq(name.to_lowercase()))
        .one(db)
        .await
}

/// Look up each named artist of `user_id`, creating the missing ones with a
/// stock image. Blank and case-insensitively repeated names are skipped.
pub async fn resolve_artists<C: ConnectionTrait>(
    db: &C,
    store: &dyn MediaStore,
    user_id: i32,
    names: &[String],
) -> Result<Vec<artist::Model>, AppError> {
    let mut seen = HashSet::new();
    let mut artists = Vec::with_capacity(names.len());

    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if !seen.insert(name.to_lowercase()) {
            continue;
        }
        if let Some(existing) = find_artist(db, user_id, name).await? {
            artists.push(existing);
            continue;
        }

        let stem = new_stem();
        store.put_default(MediaKind::ArtistImage, &stem).await?;
        let created = artist::ActiveModel {
            name: Set(name.to_string()),
            description: Set(None),
            image_stem: Set(stem.clone()),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await;

        match created {
            Ok(model) => {
                tracing::debug!(user_id, artist_id = model.id, name, "Created artist");
                artists.push(model);
            }
            Err(e) => {
                discard(store, MediaKind::ArtistImage, &stem).await;
                return Err(e.into());
            }
        }
    }

    Ok(artists)
}

/// Append `artists` to a song's credits, skipping ones already credited.
pub async fn credit_artists<C: ConnectionTrait>(
    db: &C,
    song_id: i32,
    artists: &[artist::Model],
) -> Result<(), DbErr> {
    let existing = song_artist::Entity::find()
        .filter(song_artist::Column::SongId.eq(song_id))
        .all(db)
        .await?;
    let credited: HashSet<i32> = existing.iter().map(|c| c.artist_id).collect();
    let mut position = existing.iter().map(|c| c.position + 1).max().unwrap_or(0);

    for artist in artists.iter().filter(|a| !credited.contains(&a.id)) {
        song_artist::ActiveModel {
            song_id: Set(song_id),
            artist_id: Set(artist.id),
            position: Set(position),
        }
        .insert(db)
        .await?;
        position += 1;
    }
    Ok(())
}

/// Remove every credit of a song.
pub async fn clear_credits<C: ConnectionTrait>(db: &C, song_id: i32) -> Result<(), DbErr> {
    song_artist::Entity::delete_many()
        .filter(song_artist::Column::SongId.eq(song_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Write an image for `stem`: the upload converted to JPEG when given,
/// otherwise a stock image.
pub async fn store_image(
    store: &dyn MediaStore,
    converter: &ImageConverter,
    kind: MediaKind,
    stem: &str,
    upload: Option<Vec<u8>>,
) -> Result<(), AppError> {
    match upload {
        Some(bytes) => {
            let jpeg = converter
                .to_jpeg(&bytes)
                .await
                .map_err(|e| AppError::upstream("Error while converting the image", e))?;
            store.put(kind, stem, &jpeg).await?;
        }
        None => store.put_default(kind, stem).await?,
    }
    Ok(())
}

/// Best-effort file removal; failures are only logged.
pub async fn discard(store: &dyn MediaStore, kind: MediaKind, stem: &str) {
    if let Err(e) = store.delete(kind, stem).await {
        tracing::warn!(%kind, stem, error = %e, "Failed to delete media file");
    }
}

/// Delete a song's rows (credits, playlist entries, queue slots and the song).
pub async fn delete_song_rows<C: ConnectionTrait>(db: &C, song_id: i32) -> Result<(), DbErr> {
    clear_credits(db, song_id).await?;
    playlist_song::Entity::delete_many()
        .filter(playlist_song::Column::SongId.eq(song_id))
        .exec(db)
        .await?;
    let queued_by: HashSet<i32> = queued_song::Entity::find()
        .filter(queued_song::Column::SongId.eq(song_id))
        .all(db)
        .await?
        .into_iter()
        .map(|slot| slot.user_id)
        .collect();
    queued_song::Entity::delete_many()
        .filter(queued_song::Column::SongId.eq(song_id))
        .exec(db)
        .await?;
    for user_id in queued_by {
        clamp_queue_index(db, user_id).await?;
    }
    song::Entity::delete_by_id(song_id).exec(db).await?;
    Ok(())
}

/// Pull `user_id`'s queue position back onto the last remaining slot.
async fn clamp_queue_index<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<(), DbErr> {
    let len = queued_song::Entity::find()
        .filter(queued_song::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    let last = std::cmp::Ord::max(i32::try_from(len).unwrap_or(i32::MAX).saturating_sub(1), 0);
    user::Entity::update_many()
        .col_expr(user::Column::QueueIndex, Expr::value(last))
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::QueueIndex.gt(last))
        .exec(db)
        .await?;
    Ok(())
}

/// Delete `user_id`'s artists that no longer credit any song, returning their
/// image stems.
pub async fn prune_orphan_artists<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<String>, DbErr> {
    let orphans = artist::Entity::find()
        .filter(artist::Column::UserId.eq(user_id))
        .filter(
            artist::Column::Id.not_in_subquery(
                Query::select()
                    .column(song_artist::Column::ArtistId)
                    .from(song_artist::Entity)
                    .to_owned(),
            ),
        )
        .all(db)
        .await?;
    if orphans.is_empty() {
        return Ok(Vec::new());
    }

    artist::Entity::delete_many()
        .filter(artist::Column::Id.is_in(orphans.iter().map(|a| a.id)))
        .exec(db)
        .await?;
    Ok(orphans.into_iter().map(|a| a.image_stem).collect())
}

/// Files left behind by a deleted user.
#[derive(Debug, Default)]
pub struct UserFiles {
    pub songs: Vec<String>,
    pub playlists: Vec<String>,
    pub artists: Vec<String>,
}

impl UserFiles {
    pub async fn discard(self, store: &dyn MediaStore) {
        for stem in &self.songs {
            discard(store, MediaKind::Audio, stem).await;
            discard(store, MediaKind::SongCover, stem).await;
        }
        for stem in &self.playlists {
            discard(store, MediaKind::PlaylistCover, stem).await;
        }
        for stem in &self.artists {
            discard(store, MediaKind::ArtistImage, stem).await;
        }
    }
}

/// Delete a user and everything they own, returning the stems of their files.
pub async fn delete_user_rows<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<UserFiles, DbErr> {
    let songs = song::Entity::find()
        .filter(song::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    let playlists = playlist::Entity::find()
        .filter(playlist::Column::UserId.eq(user_id))
        .all(db)
        .await?;
    let artists = artist::Entity::find()
        .filter(artist::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    let song_ids: Vec<i32> = songs.iter().map(|s| s.id).collect();
    let playlist_ids: Vec<i32> = playlists.iter().map(|p| p.id).collect();

    queued_song::Entity::delete_many()
        .filter(queued_song::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    if !playlist_ids.is_empty() {
        playlist_song::Entity::delete_many()
            .filter(playlist_song::Column::PlaylistId.is_in(playlist_ids))
            .exec(db)
            .await?;
    }
    if !song_ids.is_empty() {
        playlist_song::Entity::delete_many()
            .filter(playlist_song::Column::SongId.is_in(song_ids.clone()))
            .exec(db)
            .await?;
        song_artist::Entity::delete_many()
            .filter(song_artist::Column::SongId.is_in(song_ids))
            .exec(db)
            .await?;
    }
    song::Entity::delete_many()
        .filter(song::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    playlist::Entity::delete_many()
        .filter(playlist::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    artist::Entity::delete_many()
        .filter(artist::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    session::Entity::delete_many()
        .filter(session::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    one_time_password::Entity::delete_by_id(user_id)
        .exec(db)
        .await?;
    user::Entity::delete_by_id(user_id).exec(db).await?;

    Ok(UserFiles {
        songs: songs.into_iter().map(|s| s.file_stem).collect(),
        playlists: playlists.into_iter().map(|p| p.cover_stem).collect(),
        artists: artists.into_iter().map(|a| a.image_stem).collect(),
    })
}
