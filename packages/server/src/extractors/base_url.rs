use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::error::AppError;
use crate::state::AppState;

/// Scheme and authority used to build absolute media links.
///
/// Taken from `server.public_url` when configured, otherwise from the
/// request's `Host` header (or the forwarded one when `server.trust_proxy`
/// is set).
pub struct BaseUrl(pub String);

impl FromRequestParts<AppState> for BaseUrl {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(url) = &state.config.server.public_url {
            return Ok(BaseUrl(url.trim_end_matches('/').to_string()));
        }

        let header_value = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let forwarded = |name: &str| {
            if state.config.server.trust_proxy {
                header_value(name)
            } else {
                None
            }
        };

        let host = forwarded("x-forwarded-host")
            .or_else(|| header_value(header::HOST.as_str()))
            .unwrap_or_else(|| "localhost".to_string());
        let scheme = forwarded("x-forwarded-proto").unwrap_or_else(|| "http".to_string());

        Ok(BaseUrl(format!("{scheme}://{host}")))
    }
}
