use std::fmt;

/// The kinds of owned media the service keeps on disk.
///
/// Each kind lives in its own directory under the media root and uses a
/// fixed extension, so a row only has to remember the generated stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    SongCover,
    PlaylistCover,
    ArtistImage,
}

impl MediaKind {
    pub const ALL: [MediaKind; 4] = [
        MediaKind::Audio,
        MediaKind::SongCover,
        MediaKind::PlaylistCover,
        MediaKind::ArtistImage,
    ];

    /// Directory relative to the media root.
    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::Audio => "songs/audio",
            MediaKind::SongCover => "songs/cover",
            MediaKind::PlaylistCover => "playlist-covers",
            MediaKind::ArtistImage => "artist-images",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Audio => "m4a",
            _ => "jpg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mp4",
            _ => "image/jpeg",
        }
    }

    /// Directory under the default-image root holding stock pictures for
    /// this kind, if it has any.
    pub fn default_image_dir(self) -> Option<&'static str> {
        match self {
            MediaKind::Audio => None,
            MediaKind::SongCover => Some("songs"),
            MediaKind::PlaylistCover => Some("playlists"),
            MediaKind::ArtistImage => Some("artists"),
        }
    }

    /// `<stem>.<ext>` as exposed in URLs.
    pub fn file_name(self, stem: &str) -> String {
        format!("{stem}.{}", self.extension())
    }

    /// Strip this kind's extension from a public file name, returning the stem.
    pub fn stem_of(self, file_name: &str) -> Option<&str> {
        file_name
            .strip_suffix(self.extension())
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|stem| !stem.is_empty())
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// A fresh random stem for a new media file.
pub fn new_stem() -> String {
    uuid::Uuid::new_v4().to_string()
}
