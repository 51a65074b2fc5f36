use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::entity::song;
use crate::utils::ownership::Owned;

/// What the streamer needs to know about a song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedMedia {
    pub owner_id: i32,
    pub file_stem: String,
}

impl Owned for OwnedMedia {
    fn owner_id(&self) -> i32 {
        self.owner_id
    }
}

/// Song lookups used on the playback path.
#[async_trait]
pub trait SongRepository: Send + Sync {
    async fn find_owned(&self, song_id: i32) -> Result<Option<OwnedMedia>, DbErr>;

    async fn touch_last_played(&self, song_id: i32, at: DateTime<Utc>) -> Result<(), DbErr>;
}

pub struct DbSongRepository {
    db: DatabaseConnection,
}

impl DbSongRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SongRepository for DbSongRepository {
    async fn find_owned(&self, song_id: i32) -> Result<Option<OwnedMedia>, DbErr> {
        let found = song::Entity::find_by_id(song_id)
            .select_only()
            .column(song::Column::UserId)
            .column(song::Column::FileStem)
            .into_tuple::<(i32, String)>()
            .one(&self.db)
            .await?;

        Ok(found.map(|(owner_id, file_stem)| OwnedMedia {
            owner_id,
            file_stem,
        }))
    }

    async fn touch_last_played(&self, song_id: i32, at: DateTime<Utc>) -> Result<(), DbErr> {
        song::Entity::update_many()
            .col_expr(song::Column::LastPlayed, Expr::value(at))
            .filter(song::Column::Id.eq(song_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
