use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::error::StorageError;
use super::kind::MediaKind;
use super::traits::{BoxReader, MediaStore};

/// Filesystem-backed media store.
///
/// Files live at `{base_path}/{kind dir}/{stem}.{ext}`. Writes go through a
/// temporary file in `{base_path}/.tmp` and are renamed into place.
pub struct FilesystemMediaStore {
    base_path: PathBuf,
    default_images: PathBuf,
    max_size: u64,
}

impl FilesystemMediaStore {
    /// Create the store, making sure every kind directory exists.
    pub async fn new(
        base_path: PathBuf,
        default_images: PathBuf,
        max_size: u64,
    ) -> Result<Self, StorageError> {
        for kind in MediaKind::ALL {
            fs::create_dir_all(base_path.join(kind.dir())).await?;
        }
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            default_images,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn media_path(&self, kind: MediaKind, stem: &str) -> Result<PathBuf, StorageError> {
        validate_stem(stem)?;
        Ok(self.base_path.join(kind.dir()).join(kind.file_name(stem)))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn stock_images(&self, kind: MediaKind) -> Result<Vec<PathBuf>, StorageError> {
        let Some(dir) = kind.default_image_dir() else {
            return Ok(Vec::new());
        };
        let dir = self.default_images.join(dir);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(kind.extension()) {
                images.push(path);
            }
        }
        images.sort();
        Ok(images)
    }

    async fn write_atomically(&self, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Stems are generated UUIDs; anything outside `[A-Za-z0-9_-]` is refused so
/// a name taken from a URL can never leave its directory.
fn validate_stem(stem: &str) -> Result<(), StorageError> {
    let valid = !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidName(stem.to_string()))
    }
}

fn not_found(kind: MediaKind, stem: &str) -> StorageError {
    StorageError::NotFound(format!("{}/{}", kind.dir(), kind.file_name(stem)))
}

#[async_trait]
impl MediaStore for FilesystemMediaStore {
    fn path(&self, kind: MediaKind, stem: &str) -> Result<PathBuf, StorageError> {
        self.media_path(kind, stem)
    }

    async fn size(&self, kind: MediaKind, stem: &str) -> Result<u64, StorageError> {
        let path = self.media_path(kind, stem)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(kind, stem)),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_range(
        &self,
        kind: MediaKind,
        stem: &str,
        start: u64,
        len: u64,
    ) -> Result<BoxReader, StorageError> {
        let path = self.media_path(kind, stem)?;
        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(not_found(kind, stem));
            }
            Err(e) => return Err(e.into()),
        };
        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }
        Ok(Box::new(file.take(len)))
    }

    async fn put(&self, kind: MediaKind, stem: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }
        let path = self.media_path(kind, stem)?;
        self.write_atomically(&path, data).await
    }

    async fn put_default(&self, kind: MediaKind, stem: &str) -> Result<(), StorageError> {
        let target = self.media_path(kind, stem)?;
        let images = self.stock_images(kind).await?;
        if images.is_empty() {
            return Err(StorageError::NotFound(format!(
                "no default images for {}",
                kind.dir()
            )));
        }
        let pick = rand::rng().random_range(0..images.len());
        tracing::debug!(kind = %kind, source = %images[pick].display(), "Using default image");
        let data = fs::read(&images[pick]).await?;
        self.write_atomically(&target, &data).await
    }

    async fn delete(&self, kind: MediaKind, stem: &str) -> Result<bool, StorageError> {
        let path = self.media_path(kind, stem)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
