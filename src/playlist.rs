//! Playlist URL validation and resolution
//!
//! The listing itself comes from a [`PlaylistSource`]; this module only checks
//! the URL shape, extracts the list identifier and logs what was found.

use crate::error::{Error, Result};
use crate::types::VideoRef;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PLAYLIST_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com/playlist\?list=|youtu\.be/)[\w-]+")
        .expect("valid playlist URL regex")
});

/// Source of playlist listings
///
/// Implementations return the videos of a playlist in playlist order.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// List the videos of the playlist with the given `list` identifier
    async fn list_videos(&self, playlist_id: &str) -> Result<Vec<VideoRef>>;
}

/// Check that `url` looks like a playlist URL
///
/// Accepts `youtube.com/playlist?list=...` and `youtu.be/...` links, with or
/// without scheme and `www.`. Only the beginning of the string is checked.
pub fn validate_playlist_url(url: &str) -> Result<&str> {
    if PLAYLIST_URL_RE.is_match(url) {
        Ok(url)
    } else {
        Err(Error::InvalidPlaylistUrl(url.to_string()))
    }
}

/// Extract the `list` query parameter from a playlist URL
pub fn playlist_id(url: &str) -> Result<String> {
    let absolute = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    let parsed =
        url::Url::parse(&absolute).map_err(|_| Error::InvalidPlaylistUrl(url.to_string()))?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "list")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::InvalidPlaylistUrl(url.to_string()))
}

/// Validate `url` and fetch its videos from `source`
///
/// Fails with [`Error::InvalidPlaylistUrl`] before any request is made when the
/// URL has the wrong shape.
pub async fn resolve_playlist(source: &dyn PlaylistSource, url: &str) -> Result<Vec<VideoRef>> {
    let url = validate_playlist_url(url)?;
    let id = playlist_id(url)?;
    tracing::info!("Fetching playlist from: {url}");
    let videos = source.list_videos(&id).await?;
    tracing::info!(playlist_id = %id, "Found {} videos in playlist", videos.len());
    Ok(videos)
}
