use std::path::{Path, PathBuf};

use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;

use super::ToolError;

/// Separator used between artist names in downloaded tags.
const ARTIST_SEPARATOR: char = '，';

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Tags read from an audio file.
#[derive(Debug, Clone, Default)]
pub struct TrackTags {
    pub title: String,
    pub artists: Vec<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    /// Seconds.
    pub duration: f64,
    /// First embedded picture, in whatever format the file carries.
    pub picture: Option<Vec<u8>>,
}

/// Split an artist tag on the full-width comma, dropping blanks.
pub fn split_artists(raw: &str) -> Vec<String> {
    raw.split(ARTIST_SEPARATOR)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_blocking(path: &Path) -> Result<TrackTags, ToolError> {
    let tagged_file = Probe::open(path)
        .map_err(|e| ToolError::Metadata(e.to_string()))?
        .read()
        .map_err(|e| ToolError::Metadata(e.to_string()))?;

    let duration = tagged_file.properties().duration().as_secs_f64();
    let mut tags = TrackTags {
        title: UNKNOWN_TITLE.to_string(),
        artists: vec![UNKNOWN_ARTIST.to_string()],
        duration,
        ..Default::default()
    };

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return Ok(tags);
    };

    if let Some(title) = tag.title().map(|t| t.trim().to_string())
        && !title.is_empty()
    {
        tags.title = title;
    }
    if let Some(artist) = tag.artist() {
        let artists = split_artists(&artist);
        if !artists.is_empty() {
            tags.artists = artists;
        }
    }
    tags.genre = tag
        .genre()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());
    tags.year = tag.year().and_then(|y| i32::try_from(y).ok());
    tags.picture = tag.pictures().first().map(|p| p.data().to_vec());

    tracing::debug!(
        file = %path.display(),
        title = %tags.title,
        artists = ?tags.artists,
        "Read track tags"
    );

    Ok(tags)
}

/// Read tags and duration from an audio file.
pub async fn read_tags(path: PathBuf) -> Result<TrackTags, ToolError> {
    tokio::task::spawn_blocking(move || read_blocking(&path))
        .await
        .map_err(|e| ToolError::Metadata(format!("tag reader panicked: {e}")))?
}
