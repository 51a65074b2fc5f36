use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::config::OwnerConfig;
use crate::entity::{artist, session, song, user};
use crate::utils::password;

/// Create the owner account from configuration if no owner exists yet.
pub async fn seed_owner(db: &DatabaseConnection, owner: Option<&OwnerConfig>) -> Result<(), DbErr> {
    let existing = user::Entity::find()
        .filter(user::Column::Role.eq(user::ROLE_OWNER))
        .count(db)
        .await?;
    if existing > 0 {
        return Ok(());
    }

    let Some(owner) = owner else {
        tracing::warn!("No owner account exists and none is configured under [owner]");
        return Ok(());
    };

    let hash = password::hash_password(&owner.password)
        .map_err(|e| DbErr::Custom(format!("Password hash error: {e}")))?;

    let model = user::ActiveModel {
        username: Set(owner.username.trim().to_string()),
        email: Set(owner.email.trim().to_lowercase()),
        password: Set(hash),
        role: Set(user::ROLE_OWNER.to_string()),
        approved: Set(true),
        queue_index: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await?;

    info!("Created owner account '{}'", owner.username.trim());
    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite non-unique indexes,
/// so we create them manually on startup.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let statements = [
        (
            // Song lists are per user, ordered by title.
            "idx_song_user_title",
            Index::create()
                .if_not_exists()
                .name("idx_song_user_title")
                .table(song::Entity)
                .col(song::Column::UserId)
                .col(song::Column::Title)
                .to_string(PostgresQueryBuilder),
        ),
        (
            // Artist lookups by name happen on every import.
            "idx_artist_user_name",
            Index::create()
                .if_not_exists()
                .name("idx_artist_user_name")
                .table(artist::Entity)
                .col(artist::Column::UserId)
                .col(artist::Column::Name)
                .to_string(PostgresQueryBuilder),
        ),
        (
            "idx_session_expires",
            Index::create()
                .if_not_exists()
                .name("idx_session_expires")
                .table(session::Entity)
                .col(session::Column::ExpiresAt)
                .to_string(PostgresQueryBuilder),
        ),
    ];

    for (name, stmt) in statements {
        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {} exists", name),
            Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
        }
    }

    Ok(())
}
