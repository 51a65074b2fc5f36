use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use common::range::unsatisfied_content_range;
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::external::ToolError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_LOGGED_IN`,
    /// `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`, `CONFLICT`,
    /// `UPSTREAM_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "NOT_FOUND")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Song not found")]
    pub message: String,
    /// Remaining one-time-password attempts, on OTP mismatches only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<i32>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotLoggedIn,
    /// Wrong password or similar credential mismatch.
    InvalidCredentials(String),
    /// One-time password did not match.
    OtpMismatch {
        attempts_remaining: i32,
    },
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// The requested byte range lies outside a resource of `total` bytes.
    RangeNotSatisfiable {
        total: u64,
    },
    /// An external tool or service failed. `message` goes to the client,
    /// `detail` only to the log.
    Upstream {
        message: &'static str,
        detail: String,
    },
    Internal(String),
}

impl AppError {
    pub fn upstream(message: &'static str, detail: impl std::fmt::Display) -> Self {
        AppError::Upstream {
            message,
            detail: detail.to_string(),
        }
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, code, message, attempts_remaining) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg, None),
            AppError::NotLoggedIn => (
                StatusCode::UNAUTHORIZED,
                "NOT_LOGGED_IN",
                "Not logged in".into(),
                None,
            ),
            AppError::InvalidCredentials(msg) => {
                (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", msg, None)
            }
            AppError::OtpMismatch { attempts_remaining } => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Wrong password".into(),
                Some(attempts_remaining),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::RangeNotSatisfiable { total } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                "RANGE_NOT_SATISFIABLE",
                format!("Range not satisfiable for {total} bytes"),
                None,
            ),
            AppError::Upstream { message, detail } => {
                tracing::error!("Upstream error: {}: {}", message, detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_ERROR",
                    message.into(),
                    None,
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                    None,
                )
            }
        };

        (
            status,
            ErrorBody {
                success: false,
                code,
                message,
                attempts_remaining,
            },
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 416 carries the resource size and no body.
        if let AppError::RangeNotSatisfiable { total } = &self {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, unsatisfied_content_range(*total))],
            )
                .into_response();
        }

        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { limit, .. } => {
                AppError::Validation(format!("File exceeds maximum size of {limit} bytes"))
            }
            // A row whose file is gone is a consistency failure, not a 404.
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ToolError> for AppError {
    fn from(err: ToolError) -> Self {
        AppError::Internal(err.to_string())
    }
}
