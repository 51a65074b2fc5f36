use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "song")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Stem shared by the audio file and the cover file.
    #[sea_orm(unique)]
    pub file_stem: String,

    pub title: String,
    pub genre: Option<String>,
    /// Seconds.
    pub duration: f64,
    pub release_year: Option<i32>,
    pub is_favorite: bool,
    pub last_played: Option<DateTimeUtc>,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    #[sea_orm(has_many, via = "song_artist")]
    pub artists: HasMany<super::artist::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
