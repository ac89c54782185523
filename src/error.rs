//! Error types for playlist-transcripts
//!
//! Failures are split by where they happen:
//! - configuration and playlist URL validation (abort the run)
//! - playlist resolution against the remote listing (abort the run)
//! - per-video transcript retrieval and file writes (recorded, run continues)
//!
//! [`Error::category`] collapses every variant onto a small [`ErrorCategory`]
//! so callers can react to the kind of failure instead of its message.

use thiserror::Error;

/// Result type alias for playlist-transcripts operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-transcripts
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The environment variable that caused the error (e.g., "RETRY_ATTEMPTS")
        key: Option<String>,
    },

    /// Playlist URL does not have the expected shape
    #[error("Invalid playlist URL format: {0}")]
    InvalidPlaylistUrl(String),

    /// Playlist entry cannot be processed (e.g. empty video identifier)
    #[error("invalid video entry: {0}")]
    InvalidVideo(String),

    /// Playlist listing could not be obtained
    #[error("playlist error: {0}")]
    Playlist(#[from] PlaylistError),

    /// Transcript could not be obtained for a video
    #[error("transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// Remote answered with a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Playlist resolution errors
#[derive(Debug, Error)]
pub enum PlaylistError {
    /// Remote reports the playlist as missing, private or otherwise unavailable
    #[error("playlist {playlist_id} is unavailable: {reason}")]
    Unavailable {
        /// The playlist identifier (`list` parameter)
        playlist_id: String,
        /// Message reported by the remote, if any
        reason: String,
    },

    /// Playlist listing could not be fetched (connection, timeout, bad response body)
    #[error("could not fetch playlist {playlist_id}: {source}")]
    Fetch {
        /// The playlist identifier (`list` parameter)
        playlist_id: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// Playlist page did not contain the expected data
    #[error("could not parse playlist page: {reason}")]
    Parse {
        /// What was missing or malformed
        reason: String,
    },
}

/// Transcript retrieval errors
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Video is private, removed or otherwise unplayable
    #[error("video {video_id} is unavailable: {reason}")]
    VideoUnavailable {
        /// The video identifier
        video_id: String,
        /// Reason reported by the remote
        reason: String,
    },

    /// Video has no caption tracks at all
    #[error("transcripts are disabled for video {video_id}")]
    TranscriptsDisabled {
        /// The video identifier
        video_id: String,
    },

    /// Video has caption tracks, but none in the requested languages
    #[error("no transcript found for video {video_id} in languages {languages:?}")]
    NoTranscriptFound {
        /// The video identifier
        video_id: String,
        /// The requested language codes
        languages: Vec<String>,
    },

    /// Remote is rate limiting or asking for bot verification
    #[error("requests for video {video_id} are being blocked")]
    RequestBlocked {
        /// The video identifier
        video_id: String,
    },

    /// Watch page, player response or caption track was malformed
    #[error("could not parse transcript data for video {video_id}: {reason}")]
    Parse {
        /// The video identifier
        video_id: String,
        /// What was missing or malformed
        reason: String,
    },
}

/// Coarse failure classes used for logging and for deciding how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input: configuration values, URL shape, empty identifiers
    Validation,
    /// Network, HTTP status or rate limiting problems
    Transport,
    /// The remote has no usable content (unavailable video, no captions)
    Unavailable,
    /// Reading or writing local files failed
    Filesystem,
    /// Unexpected data or anything else
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Transport => "transport",
            ErrorCategory::Unavailable => "unavailable",
            ErrorCategory::Filesystem => "filesystem",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Shorthand for a configuration error tied to an environment variable
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Classify this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config { .. } | Error::InvalidPlaylistUrl(_) | Error::InvalidVideo(_) => {
                ErrorCategory::Validation
            }
            Error::Playlist(PlaylistError::Unavailable { .. }) => ErrorCategory::Unavailable,
            Error::Playlist(PlaylistError::Fetch { source, .. }) => source.category(),
            Error::Playlist(PlaylistError::Parse { .. }) => ErrorCategory::Internal,
            Error::Transcript(e) => match e {
                TranscriptError::VideoUnavailable { .. }
                | TranscriptError::TranscriptsDisabled { .. }
                | TranscriptError::NoTranscriptFound { .. } => ErrorCategory::Unavailable,
                TranscriptError::RequestBlocked { .. } => ErrorCategory::Transport,
                TranscriptError::Parse { .. } => ErrorCategory::Internal,
            },
            Error::Http { .. } | Error::Network(_) => ErrorCategory::Transport,
            Error::Io(_) => ErrorCategory::Filesystem,
            Error::Serialization(_) | Error::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error aborts the whole run rather than a single video
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::InvalidPlaylistUrl(_) | Error::Playlist(_)
        )
    }
}
