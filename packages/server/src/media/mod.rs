pub mod repository;
pub mod stream;

pub use repository::{DbSongRepository, OwnedMedia, SongRepository};
pub use stream::{MALFORMED_RANGE, serve_file, stream_song};
