use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "song_artist")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub song_id: i32,
    #[sea_orm(primary_key)]
    pub artist_id: i32,
    #[sea_orm(belongs_to, from = "song_id", to = "id")]
    pub song: HasOne<super::song::Entity>,
    #[sea_orm(belongs_to, from = "artist_id", to = "id")]
    pub artist: HasOne<super::artist::Entity>,

    /// Order of the artist in the song's credits.
    pub position: i32,
}

impl ActiveModelBehavior for ActiveModel {}
