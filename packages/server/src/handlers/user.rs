use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{one_time_password, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::shared::{MessageResponse, missing_data};
use crate::models::user::{
    ChangePasswordRequest, LoginRequest, LoginStateResponse, RegisterRequest,
    RegisterRequestsResponse, SendOtpRequest, UserData, UserDataResponse, UserIdRequest,
    UsersResponse, validate_password, validate_register_request,
};
use crate::session::{removal_cookie, session_cookie};
use crate::state::AppState;
use crate::utils::catalog;
use crate::utils::otp::{OTP_TTL_SECS, generate_otp};
use crate::utils::password::{hash_password, verify_password};

fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| AppError::Internal(format!("Password hash error: {e}")))
}

fn verify(password: &str, hash: &str) -> Result<bool, AppError> {
    verify_password(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verify error: {e}")))
}

async fn find_user(state: &AppState, user_id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

#[utoipa::path(
    post,
    path = "/register",
    tag = "Users",
    operation_id = "register",
    summary = "Request an account",
    description = "Creates an unapproved account. It cannot log in until an admin or the owner approves it.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register request stored", body = MessageResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Username or e-mail taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = validate_register_request(payload)?;

    let taken_name = user::Entity::find()
        .filter(user::Column::Username.eq(&account.username))
        .count(&state.db)
        .await?;
    if taken_name > 0 {
        return Err(AppError::Conflict("Username is taken".into()));
    }
    let taken_email = user::Entity::find()
        .filter(user::Column::Email.eq(&account.email))
        .count(&state.db)
        .await?;
    if taken_email > 0 {
        return Err(AppError::Conflict("E-Mail is taken".into()));
    }

    let new_user = user::ActiveModel {
        username: Set(account.username),
        email: Set(account.email),
        password: Set(hash(&account.password)?),
        role: Set(user::ROLE_USER.to_string()),
        approved: Set(false),
        queue_index: Set(0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let created = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race: unique constraint caught on insert");
            AppError::Conflict("Username is taken".into())
        }
        _ => AppError::from(e),
    })?;

    tracing::info!(user_id = created.id, username = %created.username, "Register request received");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Register request sent successfully")),
    ))
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Users",
    operation_id = "login",
    summary = "Log in",
    description = "Verifies the password of the account named by `username` or `email` and sets the `SessionId` cookie.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, cookie set", body = MessageResponse),
        (status = 400, description = "Missing data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong password (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Account not approved yet (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Unknown account (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(missing_data)?;

    let lookup = match (payload.username, payload.email) {
        (Some(name), _) if !name.trim().is_empty() => {
            user::Column::Username.eq(name.trim().to_string())
        }
        (_, Some(email)) if !email.trim().is_empty() => {
            user::Column::Email.eq(email.trim().to_lowercase())
        }
        _ => return Err(missing_data()),
    };

    let account = user::Entity::find()
        .filter(lookup)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !verify(&password, &account.password)? {
        return Err(AppError::InvalidCredentials("Wrong password".into()));
    }
    if !account.approved {
        return Err(AppError::Forbidden(
            "Register request hasn't been approved yet".into(),
        ));
    }

    let token = state.sessions.create(account.id).await?;
    tracing::info!(user_id = account.id, "User logged in");

    Ok((
        jar.add(session_cookie(token, &state.config.auth)),
        Json(MessageResponse::new("User successfully logged in")),
    ))
}

#[utoipa::path(
    post,
    path = "/logout",
    tag = "Users",
    operation_id = "logout",
    summary = "Log out",
    description = "Ends the current session and clears the cookie.",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn logout(
    auth_user: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.destroy(&auth_user.token).await?;
    Ok((
        jar.remove(removal_cookie()),
        Json(MessageResponse::new("Logged out successfully")),
    ))
}

#[utoipa::path(
    get,
    path = "/login-state",
    tag = "Users",
    operation_id = "loginState",
    summary = "Check whether the caller has a live session",
    responses((status = 200, description = "Login state", body = LoginStateResponse)),
)]
pub async fn login_state(auth_user: Option<AuthUser>) -> Json<LoginStateResponse> {
    let logged_in = auth_user.is_some();
    Json(LoginStateResponse {
        success: true,
        message: if logged_in { "Logged in" } else { "Not logged in" }.into(),
        logged_in,
    })
}

#[utoipa::path(
    get,
    path = "/userdata",
    tag = "Users",
    operation_id = "userData",
    summary = "Current user's profile",
    responses(
        (status = 200, description = "Profile", body = UserDataResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn user_data(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserDataResponse>, AppError> {
    let me = auth_user.load(&state).await?;
    Ok(Json(UserDataResponse {
        success: true,
        message: "Successfully retrieved user data".into(),
        user: UserData {
            username: me.username,
            email: me.email,
            role: me.role,
        },
    }))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Users",
    operation_id = "listUsers",
    summary = "List approved users",
    description = "Requires the admin or owner role.",
    responses(
        (status = 200, description = "Approved users ordered by name", body = UsersResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not an admin (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, AppError> {
    auth_user.require_admin(&state, "view users").await?;

    let users = user::Entity::find()
        .filter(user::Column::Approved.eq(true))
        .order_by_asc(user::Column::Username)
        .all(&state.db)
        .await?;

    Ok(Json(UsersResponse {
        success: true,
        message: "Successfully retrieved users".into(),
        users: users.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    patch,
    path = "/change-password",
    tag = "Users",
    operation_id = "changePassword",
    summary = "Change a password",
    description = "Identifies the account by session, or by `email` without one. Authorises with `passwordOld` or with a one-time password from `/users/send-otp`. A wrong one-time password uses up an attempt; when none remain the code is deleted.",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong password or code (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 404, description = "No such user or no valid code (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip_all)]
pub async fn change_password(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let password_new = payload
        .password_new
        .filter(|p| !p.is_empty())
        .ok_or_else(missing_data)?;

    validate_password(&password_new)?;

    let account = match (&auth_user, payload.email.as_deref().map(str::trim)) {
        (Some(auth_user), _) => auth_user.load(&state).await?,
        (None, Some(email)) if !email.is_empty() => user::Entity::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?,
        _ => return Err(missing_data()),
    };

    let txn = state.db.begin().await?;
    let via_otp = match (payload.password_old.as_deref(), payload.otp.as_deref()) {
        (Some(old), _) if !old.is_empty() => {
            if !verify(old, &account.password)? {
                return Err(AppError::InvalidCredentials("Wrong password".into()));
            }
            false
        }
        (_, Some(otp)) if !otp.trim().is_empty() => {
            if let Err(err) = consume_otp(&txn, account.id, otp).await {
                // Spent attempts stick even though the change is refused.
                if matches!(err, AppError::OtpMismatch { .. }) {
                    txn.commit().await?;
                }
                return Err(err);
            }
            true
        }
        _ => return Err(missing_data()),
    };

    user::Entity::update_many()
        .col_expr(user::Column::Password, Expr::value(hash(&password_new)?))
        .filter(user::Column::Id.eq(account.id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    // A reset by one-time password signs the account out everywhere.
    if via_otp {
        state.sessions.destroy_for_user(account.id).await?;
    }

    tracing::info!(user_id = account.id, via_otp, "Password changed");
    Ok(Json(MessageResponse::new("Successfully changed password")))
}

/// Check `guess` against the user's live one-time password. A match deletes
/// the code; a miss spends one attempt.
async fn consume_otp<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    guess: &str,
) -> Result<(), AppError> {
    let code = one_time_password::Entity::find_by_id(user_id)
        .filter(one_time_password::Column::ExpiresAt.gt(Utc::now()))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("No valid OTP found for this account".into()))?;

    if code.code == guess.trim().to_uppercase() {
        one_time_password::Entity::delete_by_id(user_id)
            .exec(conn)
            .await?;
        return Ok(());
    }

    let attempts_remaining = std::cmp::Ord::max(code.attempts_remaining - 1, 0);
    if attempts_remaining == 0 {
        one_time_password::Entity::delete_by_id(user_id)
            .exec(conn)
            .await?;
    } else {
        one_time_password::Entity::update_many()
            .col_expr(
                one_time_password::Column::AttemptsRemaining,
                Expr::value(attempts_remaining),
            )
            .filter(one_time_password::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;
    }

    tracing::warn!(user_id, attempts_remaining, "One-time password mismatch");
    Err(AppError::OtpMismatch { attempts_remaining })
}

#[utoipa::path(
    post,
    path = "/send-otp",
    tag = "Users",
    operation_id = "sendOtp",
    summary = "Mail a one-time password",
    description = "Issues a six-character code valid for three minutes, replacing any earlier code.",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Missing data (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No user with this e-mail (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Mail delivery failed (UPSTREAM_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip_all)]
pub async fn send_otp(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SendOtpRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(missing_data)?;

    let account = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No user with this E-Mail".into()))?;

    let code = generate_otp();
    let txn = state.db.begin().await?;
    one_time_password::Entity::delete_by_id(account.id)
        .exec(&txn)
        .await?;
    one_time_password::ActiveModel {
        user_id: Set(account.id),
        code: Set(code.clone()),
        attempts_remaining: Set(one_time_password::MAX_ATTEMPTS),
        expires_at: Set(Utc::now() + Duration::seconds(OTP_TTL_SECS)),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    if let Err(e) = state
        .mailer
        .send(
            &account.email,
            "One Time Password",
            &format!("Use this code: {code}"),
        )
        .await
    {
        one_time_password::Entity::delete_by_id(account.id)
            .exec(&state.db)
            .await?;
        return Err(AppError::upstream("Error while sending the OTP", e));
    }

    tracing::info!(user_id = account.id, "One-time password sent");
    Ok(Json(MessageResponse::new(
        "Successfully sent a OTP to your E-Mail",
    )))
}

#[utoipa::path(
    delete,
    path = "/delete",
    tag = "Users",
    operation_id = "deleteUser",
    summary = "Delete a user and all their media",
    description = "Requires the admin or owner role. The owner cannot be deleted; admins can only be deleted by the owner.",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 401, description = "Not logged in (NOT_LOGGED_IN)", body = ErrorBody),
        (status = 403, description = "Not permitted (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, target = payload.user_id))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let caller = auth_user.require_admin(&state, "delete users").await?;
    let target = find_user(&state, payload.user_id).await?;

    if target.is_owner() {
        return Err(AppError::Forbidden("Can't delete owner".into()));
    }
    if target.role == user::ROLE_ADMIN && !caller.is_owner() {
        return Err(AppError::Forbidden(
            "Can only delete admins as owner".into(),
        ));
    }

    remove_account(&state, target.id).await?;

    tracing::info!(deleted = target.id, "User deleted");
    Ok(Json(MessageResponse::new(format!(
        "Successfully deleted '{}'",
        target.username
    ))))
}

async fn remove_account(state: &AppState, user_id: i32) -> Result<(), AppError> {
    let txn = state.db.begin().await?;
    let files = catalog::delete_user_rows(&txn, user_id).await?;
    txn.commit().await?;
    files.discard(state.store.as_ref()).await;
    Ok(())
}

#[utoipa::path(
    patch,
    path = "/make-admin",
    tag = "Users",
    operation_id = "makeAdmin",
    summary = "Promote a user to admin",
    description = "Requires the owner role.",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "Promoted", body = MessageResponse),
        (status = 403, description = "Not the owner, or target is the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already admin (CONFLICT)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, target = payload.user_id))]
pub async fn make_admin(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_owner_role(&state).await?;
    let target = find_user(&state, payload.user_id).await?;

    if target.is_owner() {
        return Err(AppError::Forbidden("Can't change the owners role".into()));
    }
    if target.role == user::ROLE_ADMIN {
        return Err(AppError::Conflict("User is already admin".into()));
    }

    set_role(&state, target.id, user::ROLE_ADMIN).await?;
    Ok(Json(MessageResponse::new(format!(
        "Successfully promoted '{}' to admin",
        target.username
    ))))
}

#[utoipa::path(
    patch,
    path = "/remove-admin",
    tag = "Users",
    operation_id = "removeAdmin",
    summary = "Demote an admin to user",
    description = "Requires the owner role.",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "Demoted", body = MessageResponse),
        (status = 403, description = "Not the owner, or target is the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Not an admin (CONFLICT)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, target = payload.user_id))]
pub async fn remove_admin(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user.require_owner_role(&state).await?;
    let target = find_user(&state, payload.user_id).await?;

    if target.is_owner() {
        return Err(AppError::Forbidden("Can't change the owners role".into()));
    }
    if target.role != user::ROLE_ADMIN {
        return Err(AppError::Conflict("User is not an admin".into()));
    }

    set_role(&state, target.id, user::ROLE_USER).await?;
    Ok(Json(MessageResponse::new(format!(
        "Successfully demoted '{}' to user",
        target.username
    ))))
}

async fn set_role(state: &AppState, user_id: i32, role: &str) -> Result<(), AppError> {
    user::Entity::update_many()
        .col_expr(user::Column::Role, Expr::value(role))
        .filter(user::Column::Id.eq(user_id))
        .exec(&state.db)
        .await?;
    tracing::info!(user_id, role, "Role changed");
    Ok(())
}

async fn find_request(state: &AppState, user_id: i32) -> Result<user::Model, AppError> {
    let target = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Register request not found".into()))?;
    if target.approved {
        return Err(AppError::Conflict("User is already registered".into()));
    }
    Ok(target)
}

#[utoipa::path(
    patch,
    path = "/approve-register",
    tag = "Users",
    operation_id = "approveRegister",
    summary = "Approve a register request",
    description = "Requires the admin or owner role.",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "Approved", body = MessageResponse),
        (status = 403, description = "Not an admin (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such request (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already approved (CONFLICT)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, target = payload.user_id))]
pub async fn approve_register(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user
        .require_admin(&state, "approve register requests")
        .await?;
    let target = find_request(&state, payload.user_id).await?;

    user::Entity::update_many()
        .col_expr(user::Column::Approved, Expr::value(true))
        .filter(user::Column::Id.eq(target.id))
        .exec(&state.db)
        .await?;

    tracing::info!(approved = target.id, "Register request approved");
    Ok(Json(MessageResponse::new(format!(
        "Successfully approved the register request of user '{}'",
        target.username
    ))))
}

#[utoipa::path(
    patch,
    path = "/deny-register",
    tag = "Users",
    operation_id = "denyRegister",
    summary = "Deny and delete a register request",
    description = "Requires the admin or owner role.",
    request_body = UserIdRequest,
    responses(
        (status = 200, description = "Denied", body = MessageResponse),
        (status = 403, description = "Not an admin (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No such request (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already approved (CONFLICT)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id, target = payload.user_id))]
pub async fn deny_register(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UserIdRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_user
        .require_admin(&state, "deny register requests")
        .await?;
    let target = find_request(&state, payload.user_id).await?;

    remove_account(&state, target.id).await?;

    tracing::info!(denied = target.id, "Register request denied");
    Ok(Json(MessageResponse::new(format!(
        "Successfully denied and deleted the register request of user '{}'",
        target.username
    ))))
}

#[utoipa::path(
    get,
    path = "/register-requests",
    tag = "Users",
    operation_id = "registerRequests",
    summary = "List pending register requests",
    description = "Requires the admin or owner role.",
    responses(
        (status = 200, description = "Pending accounts, oldest first", body = RegisterRequestsResponse),
        (status = 403, description = "Not an admin (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("session" = [])),
)]
#[instrument(skip_all, fields(user_id = auth_user.user_id))]
pub async fn register_requests(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<RegisterRequestsResponse>, AppError> {
    auth_user
        .require_admin(&state, "view register requests")
        .await?;

    let pending = user::Entity::find()
        .filter(user::Column::Approved.eq(false))
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(RegisterRequestsResponse {
        success: true,
        message: "Successfully retrieved register requests".into(),
        requests: pending.into_iter().map(Into::into).collect(),
    }))
}
