use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";
/// The role assigned to newly registered users.
pub const ROLE_USER: &str = "user";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    /// One of `owner`, `admin`, `user`.
    pub role: String,
    /// Registration requests stay unapproved until an admin accepts them.
    pub approved: bool,

    /// Position of the current song in the play queue.
    pub queue_index: i32,

    #[sea_orm(has_many)]
    pub songs: HasMany<super::song::Entity>,

    #[sea_orm(has_many)]
    pub playlists: HasMany<super::playlist::Entity>,

    #[sea_orm(has_many)]
    pub artists: HasMany<super::artist::Entity>,

    #[sea_orm(has_many)]
    pub sessions: HasMany<super::session::Entity>,

    pub created_at: DateTimeUtc,
}

impl Model {
    pub fn is_owner(&self) -> bool {
        self.role == ROLE_OWNER
    }

    pub fn is_admin_or_owner(&self) -> bool {
        self.role == ROLE_OWNER || self.role == ROLE_ADMIN
    }
}

impl ActiveModelBehavior for ActiveModel {}
