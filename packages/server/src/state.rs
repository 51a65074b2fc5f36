use std::sync::Arc;

use common::storage::filesystem::FilesystemMediaStore;
use common::storage::{MediaStore, StorageError};
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::external::{ImageConverter, Mailer, SearchProvider, YtDlp};
use crate::media::{DbSongRepository, SongRepository};
use crate::session::{DbSessionStore, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn MediaStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub songs: Arc<dyn SongRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub extractor: YtDlp,
    pub converter: ImageConverter,
    pub search: SearchProvider,
}

impl AppState {
    /// Wire the database-backed collaborators and the filesystem media store.
    pub async fn new(
        db: DatabaseConnection,
        config: AppConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, StorageError> {
        let store = FilesystemMediaStore::new(
            config.media.data_dir.clone(),
            config.media.default_image_dir.clone(),
            config.media.max_upload_size,
        )
        .await?;

        Ok(Self {
            sessions: Arc::new(DbSessionStore::new(
                db.clone(),
                config.auth.session_ttl_days,
            )),
            songs: Arc::new(DbSongRepository::new(db.clone())),
            store: Arc::new(store),
            mailer,
            extractor: YtDlp::new(&config.tools.ytdlp_path, &config.tools.ffmpeg_path),
            converter: ImageConverter::new(&config.tools.ffmpeg_path),
            search: SearchProvider::new(&config.tools.search_base_url),
            config: Arc::new(config),
            db,
        })
    }
}
