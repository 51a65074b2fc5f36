use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;

/// Request body for account registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (1-32 chars, letters, digits and underscores).
    #[schema(example = "alice")]
    pub username: Option<String>,
    /// Unique e-mail address, used for one-time passwords.
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: Option<String>,
}

/// Registration fields after validation and trimming.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn validate_register_request(payload: RegisterRequest) -> Result<NewAccount, AppError> {
    let (Some(username), Some(email), Some(password)) =
        (payload.username, payload.email, payload.password)
    else {
        return Err(super::shared::missing_data());
    };

    let username = username.trim().to_string();
    validate_username(&username)?;
    let email = email.trim().to_lowercase();
    validate_email(&email)?;
    validate_password(&password)?;

    Ok(NewAccount {
        username,
        email,
        password,
    })
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::Validation(
            "Username must be 1-32 characters".into(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::Validation(
            "Username must contain only letters, digits, and underscores".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email.len() <= 254
        && !email.chars().any(char::is_whitespace)
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'));
    if !valid {
        return Err(AppError::Validation("Invalid E-Mail address".into()));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be 8-128 characters".into(),
        ));
    }
    Ok(())
}

/// Request body for login. Either `username` or `email` identifies the account.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: Option<String>,
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
    #[schema(example = "s3cure_P@ss!")]
    pub password: Option<String>,
}

/// Request body for changing a password, by old password or one-time password.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Identifies the account when no session is present.
    pub email: Option<String>,
    pub password_old: Option<String>,
    /// Code previously sent by `/users/send-otp`.
    #[schema(example = "A7K2Q9")]
    pub otp: Option<String>,
    pub password_new: Option<String>,
}

/// Request body for `/users/send-otp`.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SendOtpRequest {
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
}

/// Request body for admin operations on a single user.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserIdRequest {
    #[schema(example = 7)]
    pub user_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginStateResponse {
    pub success: bool,
    #[schema(example = "Logged in")]
    pub message: String,
    pub logged_in: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserData {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[schema(example = "user")]
    pub role: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserDataResponse {
    pub success: bool,
    pub message: String,
    pub user: UserData,
}

/// A user as listed to admins.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[schema(example = 7)]
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UsersResponse {
    pub success: bool,
    pub message: String,
    pub users: Vec<UserSummary>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterRequestsResponse {
    pub success: bool,
    pub message: String,
    pub requests: Vec<UserSummary>,
}
