use std::ffi::OsStr;

use super::{ToolError, run};

/// Converts arbitrary images to JPEG through `ffmpeg`.
#[derive(Debug, Clone)]
pub struct ImageConverter {
    ffmpeg: String,
}

/// JPEG files start with an SOI marker followed by another marker.
pub fn is_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFF, 0xD8, 0xFF])
}

impl ImageConverter {
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Return `input` as JPEG bytes. JPEG input is passed through untouched.
    pub async fn to_jpeg(&self, input: &[u8]) -> Result<Vec<u8>, ToolError> {
        if is_jpeg(input) {
            return Ok(input.to_vec());
        }

        let scratch = std::env::temp_dir().join(format!("sonicwave-image-{}", uuid::Uuid::new_v4()));
        let source = scratch.with_extension("src");
        let target = scratch.with_extension("jpg");

        let result = async {
            tokio::fs::write(&source, input).await?;
            run(
                &self.ffmpeg,
                [
                    OsStr::new("-y"),
                    OsStr::new("-loglevel"),
                    OsStr::new("error"),
                    OsStr::new("-i"),
                    source.as_os_str(),
                    target.as_os_str(),
                ],
            )
            .await?;
            Ok::<_, ToolError>(tokio::fs::read(&target).await?)
        }
        .await;

        let _ = tokio::fs::remove_file(&source).await;
        let _ = tokio::fs::remove_file(&target).await;

        result
    }
}
