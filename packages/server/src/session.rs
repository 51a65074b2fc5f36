//! Server-side sessions keyed by an opaque cookie token.

use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;
use crate::entity::session;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "SessionId";

/// Maps session tokens to user ids.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session for `user_id` and return the cookie token.
    async fn create(&self, user_id: i32) -> Result<String, DbErr>;

    /// Look up the user behind a token. Expired sessions resolve to `None`;
    /// live ones have their expiry pushed forward.
    async fn resolve(&self, token: &str) -> Result<Option<i32>, DbErr>;

    async fn destroy(&self, token: &str) -> Result<(), DbErr>;

    /// End every session of a user.
    async fn destroy_for_user(&self, user_id: i32) -> Result<(), DbErr>;

    /// Delete expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, DbErr>;
}

/// Session store backed by the `session` table.
pub struct DbSessionStore {
    db: DatabaseConnection,
    ttl: Duration,
}

impl DbSessionStore {
    pub fn new(db: DatabaseConnection, ttl_days: i64) -> Self {
        Self {
            db,
            ttl: Duration::days(ttl_days),
        }
    }
}

/// 128 random bits, hex encoded.
pub fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Key under which a token is stored.
pub fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[async_trait]
impl SessionStore for DbSessionStore {
    async fn create(&self, user_id: i32) -> Result<String, DbErr> {
        let token = generate_token();
        let now = Utc::now();
        let model = session::ActiveModel {
            id: Set(token_key(&token)),
            user_id: Set(user_id),
            expires_at: Set(now + self.ttl),
            created_at: Set(now),
        };
        session::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<i32>, DbErr> {
        let key = token_key(token);
        let Some(found) = session::Entity::find_by_id(key.clone()).one(&self.db).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if found.expires_at <= now {
            session::Entity::delete_by_id(key).exec(&self.db).await?;
            return Ok(None);
        }

        session::Entity::update_many()
            .col_expr(session::Column::ExpiresAt, Expr::value(now + self.ttl))
            .filter(session::Column::Id.eq(key))
            .exec(&self.db)
            .await?;

        Ok(Some(found.user_id))
    }

    async fn destroy(&self, token: &str) -> Result<(), DbErr> {
        session::Entity::delete_by_id(token_key(token))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn destroy_for_user(&self, user_id: i32) -> Result<(), DbErr> {
        session::Entity::delete_many()
            .filter(session::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, DbErr> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(Utc::now()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

/// The `SessionId` cookie set at login.
pub fn session_cookie(token: String, auth: &AuthConfig) -> Cookie<'static> {
    let same_site = if auth.secure_cookie {
        SameSite::Strict
    } else {
        SameSite::Lax
    };
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(auth.secure_cookie)
        .same_site(same_site)
        .max_age(time::Duration::days(auth.session_ttl_days))
        .build()
}

/// A cookie that, when removed from the jar, clears `SessionId`.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
