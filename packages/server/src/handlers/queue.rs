use std::collections::HashSet;

use axum::{Json, extract::State};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{queued_song, song, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::queue::{ChangeSongRequest, QueueAction, QueueResponse, SetQueueRequest};
use crate::models::shared::MessageResponse;
use crate::state::AppState;

async fn set_index<C: ConnectionTrait>(db: &C, user_id: i32, index: i32) -> Result<(), DbErr> {
    user::Entity::update_many()
        .col_expr(user::Column::QueueIndex, Expr::value(index))
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Queue",
    operation_id = "getQueue",
    summary = "Get the caller's play queue",
    responses(
        (status = 200, description = "Song ids in play order and the current position", body = QueueResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn get_queue(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<QueueResponse>, AppError> {
    let queue: Vec<i32> = queued_song::Entity::find()
        .filter(queued_song::Column::UserId.eq(auth_user.user_id))
        .order_by_asc(queued_song::Column::Position)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|slot| slot.song_id)
        .collect();

    if queue.is_empty() {
        return Ok(Json(QueueResponse {
            success: true,
            message: "The queue is empty".into(),
            queue_index: None,
            queue,
        }));
    }

    let me = auth_user.load(&state).await?;
    Ok(Json(QueueResponse {
        success: true,
        message: "Successfully retrieved queue from database".into(),
        queue_index: Some(me.queue_index),
        queue,
    }))
}

#[utoipa::path(
    post,
    path = "/set",
    tag = "Queue",
    operation_id = "setQueue",
    summary = "Replace the caller's play queue",
    description = "Every song must belong to the caller. The current position is reset to the first song.",
    request_body = SetQueueRequest,
    responses(
        (status = 200, description = "Queue replaced", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not your song (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Song not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, len = payload.queue.len()))]
pub async fn set_queue(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SetQueueRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let distinct: HashSet<i32> = payload.queue.iter().copied().collect();
    if !distinct.is_empty() {
        let songs = song::Entity::find()
            .filter(song::Column::Id.is_in(distinct.iter().copied()))
            .all(&state.db)
            .await?;
        if songs.len() < distinct.len() {
            return Err(AppError::NotFound("Song not found".into()));
        }
        if songs.iter().any(|s| s.user_id != auth_user.user_id) {
            return Err(AppError::Forbidden("Not your song".into()));
        }
    }

    let txn = state.db.begin().await?;
    queued_song::Entity::delete_many()
        .filter(queued_song::Column::UserId.eq(auth_user.user_id))
        .exec(&txn)
        .await?;
    if !payload.queue.is_empty() {
        let slots = payload
            .queue
            .iter()
            .enumerate()
            .map(|(position, &song_id)| queued_song::ActiveModel {
                user_id: Set(auth_user.user_id),
                position: Set(position as i32),
                song_id: Set(song_id),
            });
        queued_song::Entity::insert_many(slots)
            .exec_without_returning(&txn)
            .await?;
    }
    set_index(&txn, auth_user.user_id, 0).await?;
    txn.commit().await?;

    Ok(Json(MessageResponse::new("Successfully set queue")))
}

#[utoipa::path(
    patch,
    path = "/change-song",
    tag = "Queue",
    operation_id = "changeQueueSong",
    summary = "Move to the next or previous song",
    description = "The position stays within the queue: moving past either end keeps it at that end.",
    request_body = ChangeSongRequest,
    responses(
        (status = 200, description = "Position changed", body = MessageResponse),
        (status = 400, description = "Unknown action (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn change_song(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChangeSongRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let action = QueueAction::parse(payload.action.as_deref())?;

    let len = queued_song::Entity::find()
        .filter(queued_song::Column::UserId.eq(auth_user.user_id))
        .count(&state.db)
        .await?;
    let me = auth_user.load(&state).await?;
    let index = action.apply(me.queue_index, len as usize);
    set_index(&state.db, auth_user.user_id, index).await?;

    Ok(Json(MessageResponse::new(
        "Successfully changed the selected song of the queue",
    )))
}

#[utoipa::path(
    delete,
    path = "/clear",
    tag = "Queue",
    operation_id = "clearQueue",
    summary = "Empty the caller's play queue",
    responses(
        (status = 200, description = "Queue cleared", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn clear_queue(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let txn = state.db.begin().await?;
    queued_song::Entity::delete_many()
        .filter(queued_song::Column::UserId.eq(auth_user.user_id))
        .exec(&txn)
        .await?;
    set_index(&txn, auth_user.user_id, 0).await?;
    txn.commit().await?;

    Ok(Json(MessageResponse::new("Successfully cleared queue")))
}
