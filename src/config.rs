//! Run configuration for playlist-transcripts
//!
//! Everything is read once from the environment into an immutable [`RunConfig`]
//! that is then passed explicitly to every component.

use crate::error::{Error, Result};
use std::{path::PathBuf, time::Duration};

/// Playlist used when `PLAYLIST_URL` is not set
pub const DEFAULT_PLAYLIST_URL: &str =
    "https://www.youtube.com/playlist?list=PLxbwE86jKRgMpuZuLBivzlM8s2Dk5lXBQ";

/// Output directory used when `OUTPUT_FOLDER` is not set
pub const DEFAULT_OUTPUT_FOLDER: &str = "transcripts";

/// Log file used when `LOG_FILE` is not set
pub const DEFAULT_LOG_FILE: &str = "transcript_download.log";

/// Retry configuration for transcript fetches
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Total number of language-constrained attempts, at least 1 (default: 3)
    ///
    /// The last failed attempt is followed by one unconstrained fallback fetch.
    pub max_attempts: u32,

    /// Delay after the first failed attempt (default: 1 second)
    pub initial_delay: Duration,

    /// Maximum delay between attempts (default: 60 seconds)
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }
}

/// Credentials for the rotating residential proxy
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy username (without the `-rotate` suffix)
    pub username: String,
    /// Proxy password
    pub password: String,
}

// Keep the password out of logs.
impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Immutable configuration for one run
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Playlist URL (validated when the playlist is resolved)
    pub playlist_url: String,

    /// Directory transcripts are written to (default: "transcripts")
    pub output_dir: PathBuf,

    /// Retry policy for transcript fetches
    pub retry: RetryConfig,

    /// Pause after every freshly written transcript (default: 0.5 seconds)
    pub rate_limit_delay: Duration,

    /// Rotating proxy credentials, `None` for direct connections
    pub proxy: Option<ProxyConfig>,

    /// Preferred transcript languages, tried in order (default: en, en-US)
    pub languages: Vec<String>,

    /// Log file path (default: "transcript_download.log")
    pub log_file: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            playlist_url: DEFAULT_PLAYLIST_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_FOLDER),
            retry: RetryConfig::default(),
            rate_limit_delay: Duration::from_millis(500),
            proxy: None,
            languages: default_languages(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl RunConfig {
    /// Load configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first if present;
    /// variables already set in the environment take precedence.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = RunConfig::default();

        if let Some(url) = get("PLAYLIST_URL") {
            config.playlist_url = url;
        }
        if let Some(dir) = get("OUTPUT_FOLDER") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get("RETRY_ATTEMPTS") {
            config.retry.max_attempts = parse_attempts(&raw)?;
        }
        if let Some(raw) = get("RATE_LIMIT_DELAY") {
            config.rate_limit_delay = parse_delay(&raw)?;
        }
        if let Some(raw) = get("TRANSCRIPT_LANGUAGES") {
            config.languages = parse_languages(&raw)?;
        }
        config.log_file = log_file_from_lookup(&lookup);

        let use_proxy = get("USE_PROXY").is_some_and(|v| parse_flag(&v));
        if use_proxy {
            match (get("PROXY_USER"), get("PROXY_PASS")) {
                (Some(username), Some(password)) => {
                    config.proxy = Some(ProxyConfig { username, password });
                }
                (None, _) => {
                    return Err(Error::config(
                        "PROXY_USER",
                        "USE_PROXY is enabled but PROXY_USER and PROXY_PASS are required",
                    ));
                }
                (_, None) => {
                    return Err(Error::config(
                        "PROXY_PASS",
                        "USE_PROXY is enabled but PROXY_USER and PROXY_PASS are required",
                    ));
                }
            }
        }

        Ok(config)
    }
}

/// Log file path from `LOG_FILE`, or the default
///
/// Never fails, so logging can be set up before the rest of the
/// configuration is validated and configuration errors reach the log file.
pub fn log_file_from_env() -> PathBuf {
    dotenvy::dotenv().ok();
    log_file_from_lookup(|key| std::env::var(key).ok())
}

/// [`log_file_from_env`] through an arbitrary variable lookup
pub fn log_file_from_lookup<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("LOG_FILE")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from)
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string(), "en-US".to_string()]
}

/// `true`, `1` and `yes` (any case) enable a flag; anything else disables it
fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

fn parse_attempts(raw: &str) -> Result<u32> {
    match raw.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::config(
            "RETRY_ATTEMPTS",
            format!("RETRY_ATTEMPTS must be a positive integer, got {raw:?}"),
        )),
    }
}

fn parse_delay(raw: &str) -> Result<Duration> {
    match raw.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(Error::config(
            "RATE_LIMIT_DELAY",
            format!("RATE_LIMIT_DELAY must be a non-negative number of seconds, got {raw:?}"),
        )),
    }
}

fn parse_languages(raw: &str) -> Result<Vec<String>> {
    let languages: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if languages.is_empty() {
        return Err(Error::config(
            "TRANSCRIPT_LANGUAGES",
            "TRANSCRIPT_LANGUAGES must list at least one language code",
        ));
    }
    Ok(languages)
}
