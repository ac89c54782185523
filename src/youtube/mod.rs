//! YouTube client implementing [`PlaylistSource`] and [`TranscriptSource`]
//!
//! Playlists are read from the `ytInitialData` blob of the playlist page and
//! extended through innertube `browse` continuations. Transcripts come from the
//! caption tracks listed in the innertube `player` response.
//!
//! [`PlaylistSource`]: crate::playlist::PlaylistSource
//! [`TranscriptSource`]: crate::transcript::TranscriptSource

mod captions;
mod playlist;

use crate::config::{ProxyConfig, RunConfig};
use crate::error::{Error, PlaylistError, Result, TranscriptError};
use crate::playlist::PlaylistSource;
use crate::transcript::TranscriptSource;
use crate::types::{Transcript, VideoRef};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::sync::LazyLock;
use std::time::Duration;

/// Origin used in production
pub const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// Rotating residential proxy endpoint
const PROXY_ENDPOINT: &str = "http://p.webshare.io:80";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on continuation requests for one playlist
const MAX_PLAYLIST_PAGES: usize = 500;

/// Web client version sent with browse requests when the page does not name one
const DEFAULT_WEB_CLIENT_VERSION: &str = "2.20240101.00.00";

/// Client context for player requests; this client still receives caption tracks
const PLAYER_CLIENT_NAME: &str = "ANDROID";
const PLAYER_CLIENT_VERSION: &str = "20.10.38";

#[allow(clippy::expect_used)]
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid api key regex")
});

#[allow(clippy::expect_used)]
static CLIENT_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_CLIENT_VERSION":\s*"([0-9.]+)""#).expect("valid version regex")
});

#[allow(clippy::expect_used)]
static CONSENT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid consent regex"));

/// HTTP client for YouTube playlist pages, innertube and caption tracks
#[derive(Clone, Debug)]
pub struct YouTubeClient {
    http: reqwest::Client,
    base_url: String,
}

impl YouTubeClient {
    /// Create a client for youtube.com using the proxy settings of `config`
    pub fn new(config: &RunConfig) -> Result<Self> {
        Self::with_base_url(YOUTUBE_BASE_URL, config.proxy.as_ref())
    }

    /// Create a client against another origin
    pub fn with_base_url(base_url: &str, proxy: Option<&ProxyConfig>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT);

        if let Some(proxy) = proxy {
            let rotating_user = format!("{}-rotate", proxy.username);
            builder = builder
                .proxy(reqwest::Proxy::all(PROXY_ENDPOINT)?.basic_auth(&rotating_user, &proxy.password))
                // A rotating proxy hands out a new IP per connection
                .pool_max_idle_per_host(0);
            tracing::info!("✓ API initialized with proxy configuration");
        } else {
            tracing::info!("✓ API initialized without proxy");
            tracing::warn!("⚠️  Note: Without proxy, you may hit rate limits on large playlists");
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_text(&self, url: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self.http.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    /// Watch page HTML, passing the cookie consent interstitial if shown
    async fn watch_page(&self, video_id: &str) -> Result<String> {
        let url = format!("{}/watch?v={}", self.base_url, video_id);
        let html = self.get_text(&url, None).await?;
        if !html.contains(r#"action="https://consent.youtube.com/s""#) {
            return Ok(html);
        }

        tracing::debug!(video_id, "Consent page shown, retrying with consent cookie");
        let value = CONSENT_VALUE_RE
            .captures(&html)
            .map(|c| c[1].to_string())
            .ok_or_else(|| TranscriptError::Parse {
                video_id: video_id.to_string(),
                reason: "consent form without value".to_string(),
            })?;
        let cookie = format!("CONSENT=YES+{value}");
        let html = self.get_text(&url, Some(&cookie)).await?;
        if html.contains(r#"action="https://consent.youtube.com/s""#) {
            return Err(TranscriptError::Parse {
                video_id: video_id.to_string(),
                reason: "consent cookie was not accepted".to_string(),
            }
            .into());
        }
        Ok(html)
    }

    async fn fetch_transcript(&self, video_id: &str, languages: Option<&[String]>) -> Result<Transcript> {
        let html = self.watch_page(video_id).await?;
        if html.contains(r#"class="g-recaptcha""#) {
            return Err(TranscriptError::RequestBlocked {
                video_id: video_id.to_string(),
            }
            .into());
        }
        let api_key = extract_api_key(&html).ok_or_else(|| TranscriptError::Parse {
            video_id: video_id.to_string(),
            reason: "INNERTUBE_API_KEY not found in watch page".to_string(),
        })?;

        let player_url = format!("{}/youtubei/v1/player?key={}", self.base_url, api_key);
        let body = json!({
            "context": {"client": {
                "clientName": PLAYER_CLIENT_NAME,
                "clientVersion": PLAYER_CLIENT_VERSION,
            }},
            "videoId": video_id,
        });
        let response: captions::PlayerResponse =
            serde_json::from_value(self.post_json(&player_url, &body).await?)?;
        let tracks = captions::caption_tracks(video_id, response)?;

        let track = captions::select_track(&tracks, languages).ok_or_else(|| {
            TranscriptError::NoTranscriptFound {
                video_id: video_id.to_string(),
                languages: languages.map(<[String]>::to_vec).unwrap_or_default(),
            }
        })?;

        let xml = self.get_text(&track.transcript_url(), None).await?;
        let transcript = captions::build_transcript(video_id, track, &xml);
        tracing::debug!(
            video_id,
            language = %transcript.language_code,
            snippets = transcript.snippets.len(),
            "Fetched caption track"
        );
        Ok(transcript)
    }

    async fn fetch_playlist(&self, playlist_id: &str) -> Result<Vec<VideoRef>> {
        let url = format!("{}/playlist?list={}", self.base_url, playlist_id);
        let html = self.get_text(&url, None).await?;
        let data = playlist::extract_initial_data(&html)?;
        let first = playlist::parse_page(&data);

        if first.videos.is_empty() {
            return match first.alert {
                Some(reason) => Err(PlaylistError::Unavailable {
                    playlist_id: playlist_id.to_string(),
                    reason,
                }
                .into()),
                None => Ok(Vec::new()),
            };
        }

        let mut videos = first.videos;
        let mut continuation = first.continuation;
        if continuation.is_none() {
            return Ok(videos);
        }

        let api_key = extract_api_key(&html).ok_or_else(|| PlaylistError::Parse {
            reason: "INNERTUBE_API_KEY not found in playlist page".to_string(),
        })?;
        let client_version = CLIENT_VERSION_RE
            .captures(&html)
            .map_or_else(|| DEFAULT_WEB_CLIENT_VERSION.to_string(), |c| c[1].to_string());
        let browse_url = format!("{}/youtubei/v1/browse?key={}", self.base_url, api_key);

        let mut pages = 1;
        while let Some(token) = continuation.take() {
            if pages >= MAX_PLAYLIST_PAGES {
                tracing::warn!(
                    playlist_id,
                    pages,
                    "Stopping playlist listing at page limit"
                );
                break;
            }
            let body = json!({
                "context": {"client": {"clientName": "WEB", "clientVersion": client_version}},
                "continuation": token,
            });
            let page = playlist::parse_page(&self.post_json(&browse_url, &body).await?);
            tracing::debug!(playlist_id, page = pages + 1, videos = page.videos.len(), "Fetched playlist continuation");
            videos.extend(page.videos);
            continuation = page.continuation;
            pages += 1;
        }

        Ok(videos)
    }
}

/// Innertube API key embedded in a YouTube page
fn extract_api_key(html: &str) -> Option<String> {
    API_KEY_RE.captures(html).map(|c| c[1].to_string())
}

/// Rate limiting shows up as 429; report it as a blocked request
fn blocked_if_rate_limited(error: Error, video_id: &str) -> Error {
    match error {
        Error::Http { status: 429, .. } => TranscriptError::RequestBlocked {
            video_id: video_id.to_string(),
        }
        .into(),
        other => other,
    }
}

/// Every failure while listing a playlist is a playlist error
fn playlist_failure(error: Error, playlist_id: &str) -> Error {
    match error {
        e @ Error::Playlist(_) => e,
        Error::Http { status, url } => PlaylistError::Unavailable {
            playlist_id: playlist_id.to_string(),
            reason: format!("HTTP {status} from {url}"),
        }
        .into(),
        other => PlaylistError::Fetch {
            playlist_id: playlist_id.to_string(),
            source: Box::new(other),
        }
        .into(),
    }
}

#[async_trait]
impl PlaylistSource for YouTubeClient {
    async fn list_videos(&self, playlist_id: &str) -> Result<Vec<VideoRef>> {
        self.fetch_playlist(playlist_id)
            .await
            .map_err(|e| playlist_failure(e, playlist_id))
    }
}

#[async_trait]
impl TranscriptSource for YouTubeClient {
    async fn fetch(&self, video_id: &str, languages: Option<&[String]>) -> Result<Transcript> {
        self.fetch_transcript(video_id, languages)
            .await
            .map_err(|e| blocked_if_rate_limited(e, video_id))
    }
}
