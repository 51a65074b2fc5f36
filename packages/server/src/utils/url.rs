use common::storage::MediaKind;
use rand::Rng;

/// Public path prefix each media kind is served under.
fn route_prefix(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "/songs/play",
        MediaKind::SongCover => "/songs/cover",
        MediaKind::PlaylistCover => "/playlists/cover",
        MediaKind::ArtistImage => "/artists/image",
    }
}

/// Absolute URL of an owned image, e.g. `http://host/songs/cover/<stem>.jpg`.
pub fn media_url(base: &str, kind: MediaKind, stem: &str) -> String {
    format!("{base}{}/{}", route_prefix(kind), kind.file_name(stem))
}

/// URL of one of the six stock song covers, picked at random.
pub fn random_default_cover_url(base: &str) -> String {
    let n = rand::rng().random_range(1..=6);
    format!("{base}/default-images/songs/{n}.jpg")
}
