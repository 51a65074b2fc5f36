use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::kind::MediaKind;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Storage for owned media files, addressed by kind and generated stem.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Location of a media file on disk.
    ///
    /// External tools write their output straight to this path.
    fn path(&self, kind: MediaKind, stem: &str) -> Result<PathBuf, StorageError>;

    /// Size of a media file in bytes.
    async fn size(&self, kind: MediaKind, stem: &str) -> Result<u64, StorageError>;

    /// Open `len` bytes of a media file starting at byte `start`.
    ///
    /// The file handle is released when the returned reader is dropped.
    async fn open_range(
        &self,
        kind: MediaKind,
        stem: &str,
        start: u64,
        len: u64,
    ) -> Result<BoxReader, StorageError>;

    /// Open a whole media file.
    async fn open(&self, kind: MediaKind, stem: &str) -> Result<BoxReader, StorageError> {
        let size = self.size(kind, stem).await?;
        self.open_range(kind, stem, 0, size).await
    }

    /// Read a whole media file into memory.
    async fn read(&self, kind: MediaKind, stem: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open(kind, stem).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Write a media file, replacing any previous content.
    async fn put(&self, kind: MediaKind, stem: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Fill a media file with a randomly chosen stock image for its kind.
    async fn put_default(&self, kind: MediaKind, stem: &str) -> Result<(), StorageError>;

    /// Delete a media file.
    ///
    /// Returns `true` if the file was deleted, `false` if it did not exist.
    async fn delete(&self, kind: MediaKind, stem: &str) -> Result<bool, StorageError>;
}
