//! Track search by scraping a public search page.

use std::sync::LazyLock;

use futures::future::try_join_all;
use regex::Regex;
use serde::Serialize;

use super::ToolError;
use super::metadata::{UNKNOWN_ARTIST, UNKNOWN_TITLE};

pub const UNKNOWN_GENRE: &str = "(None)";

/// One search hit. `cover` is `None` when the page has no artwork.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub url: String,
    pub cover: Option<String>,
}

#[derive(Clone)]
pub struct SearchProvider {
    client: reqwest::Client,
    base_url: String,
}

impl SearchProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ToolError> {
        let page = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let lookups = track_paths(&page)
            .into_iter()
            .map(|path| self.track(format!("{}{}", self.base_url, path)));
        try_join_all(lookups).await
    }

    async fn track(&self, url: String) -> Result<SearchResult, ToolError> {
        let page = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_track_page(&page, url))
    }
}

static TRACK_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<h2><a href="(/[^/]+/[^/]+)">"#).expect("valid regex"));
static COVER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img src="([^"]+)""#).expect("valid regex"));
static TITLE_AND_ARTIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<h1 itemprop="name"><a itemprop="url" href="[^"]+">([^<]+)</a>\s*by\s*<a[^>]+>([^<]+)"#,
    )
    .expect("valid regex")
});
static GENRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""genre" content="([^"]+)""#).expect("valid regex"));
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[^;]+;").expect("valid regex"));

/// Paths of the form `/<user>/<track>` linked from result headings.
pub fn track_paths(html: &str) -> Vec<String> {
    TRACK_LINK
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Strip HTML entities the way the search page needs: `&amp;` keeps its
/// ampersand, `&#x27;` becomes an apostrophe, anything else is dropped.
pub fn clean_entities(text: &str) -> String {
    let text = text.replace("amp;", "").replace("&#x27;", "'");
    ENTITY.replace_all(&text, "").into_owned()
}

fn first_capture(re: &Regex, html: &str) -> Option<String> {
    re.captures(html).map(|caps| caps[1].to_string())
}

pub fn parse_track_page(html: &str, url: String) -> SearchResult {
    let cover = first_capture(&COVER, html);
    let (title, artist) = TITLE_AND_ARTIST
        .captures(html)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .unwrap_or_else(|| (UNKNOWN_TITLE.to_string(), UNKNOWN_ARTIST.to_string()));
    let genre = first_capture(&GENRE, html).unwrap_or_else(|| UNKNOWN_GENRE.to_string());

    SearchResult {
        title: clean_entities(&title),
        artist: clean_entities(&artist),
        genre: clean_entities(&genre),
        url,
        cover,
    }
}
