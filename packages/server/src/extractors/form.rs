use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{FromRequest, Multipart, Request};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::state::AppState;

/// A fully buffered `multipart/form-data` body.
///
/// Text parts are kept as strings, file parts as bytes. Empty file parts
/// (a form submitted without choosing a file) are dropped.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

impl MultipartForm {
    /// Trimmed text field, `None` when absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.trim())
    }

    /// Text field that must be present and non-blank.
    pub fn require(&self, name: &str) -> Result<&str, AppError> {
        self.text(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(crate::models::shared::missing_data)
    }

    /// Parse a text field; an unparsable value is a 400.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>, AppError> {
        match self.text(name) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| AppError::Validation(format!("Invalid value for {name}"))),
        }
    }

    /// Decode a text field holding JSON.
    pub fn json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AppError> {
        match self.text(name) {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| AppError::Validation(format!("Invalid value for {name}: {e}"))),
        }
    }

    pub fn take_file(&mut self, name: &str) -> Option<Vec<u8>> {
        self.files.remove(name)
    }

    #[cfg(test)]
    pub fn with_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }
}

impl FromRequest<AppState> for MultipartForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limit = state.config.media.max_upload_size;
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if field.file_name().is_some() {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                if bytes.len() as u64 > limit {
                    return Err(AppError::Validation(format!(
                        "File exceeds maximum size of {limit} bytes"
                    )));
                }
                if !bytes.is_empty() {
                    form.files.insert(name, bytes.to_vec());
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }
}
