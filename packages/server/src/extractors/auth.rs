use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use sea_orm::EntityTrait;

use crate::entity::user;
use crate::error::AppError;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Caller identified by the `SessionId` cookie.
///
/// Add this as a handler parameter to require a live session; use
/// `Option<AuthUser>` where a session is optional.
pub struct AuthUser {
    pub user_id: i32,
    pub token: String,
}

impl AuthUser {
    /// Load the caller's user row. A session whose user is gone counts as
    /// not logged in.
    pub async fn load(&self, state: &AppState) -> Result<user::Model, AppError> {
        user::Entity::find_by_id(self.user_id)
            .one(&state.db)
            .await?
            .ok_or(AppError::NotLoggedIn)
    }

    /// Load the caller and require the admin or owner role.
    pub async fn require_admin(&self, state: &AppState, action: &str) -> Result<user::Model, AppError> {
        let caller = self.load(state).await?;
        if !caller.is_admin_or_owner() {
            return Err(AppError::Forbidden(format!(
                "Only admins and the owner can {action}"
            )));
        }
        Ok(caller)
    }

    /// Load the caller and require the owner role.
    pub async fn require_owner_role(&self, state: &AppState) -> Result<user::Model, AppError> {
        let caller = self.load(state).await?;
        if !caller.is_owner() {
            return Err(AppError::Forbidden(
                "Only the owner can manage user roles".into(),
            ));
        }
        Ok(caller)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(AppError::NotLoggedIn)?;

        let user_id = state
            .sessions
            .resolve(&token)
            .await?
            .ok_or(AppError::NotLoggedIn)?;

        Ok(AuthUser { user_id, token })
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <AuthUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::NotLoggedIn) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
