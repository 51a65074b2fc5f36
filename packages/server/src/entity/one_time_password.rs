use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of guesses allowed per code.
pub const MAX_ATTEMPTS: i32 = 3;

/// At most one live code per user; issuing a new one replaces it.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "one_time_password")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub code: String,
    pub attempts_remaining: i32,
    pub expires_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
