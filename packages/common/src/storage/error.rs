use thiserror::Error;

/// Errors that can occur while reading or writing media files.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested file does not exist.
    #[error("media file not found: {0}")]
    NotFound(String),
    /// The stem contains characters that could escape the media directory.
    #[error("invalid media file name: {0}")]
    InvalidName(String),
    /// The upload exceeds the configured size limit.
    #[error("media file exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
