//! Core types for playlist-transcripts

use crate::error::Error;
use crate::stats::RunStats;
use std::path::PathBuf;

/// One entry of a playlist
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoRef {
    /// Video identifier, unique within a playlist
    pub id: String,
    /// Display title as reported by the playlist listing
    pub title: String,
}

impl VideoRef {
    /// Create a new VideoRef
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// One timed line of a transcript
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptSnippet {
    /// Plain text of the line
    pub text: String,
    /// Start offset in seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

/// A fetched transcript
#[derive(Clone, Debug, PartialEq)]
pub struct Transcript {
    /// Video the transcript belongs to
    pub video_id: String,
    /// Language code of the caption track (e.g. "en")
    pub language_code: String,
    /// Human-readable language name (e.g. "English (auto-generated)")
    pub language: String,
    /// Whether the track was generated by speech recognition
    pub is_generated: bool,
    /// Snippets in playback order
    pub snippets: Vec<TranscriptSnippet>,
}

impl Transcript {
    /// Render the transcript as plain text, one snippet per line
    pub fn to_plain_text(&self) -> String {
        self.snippets
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of processing one video
#[derive(Debug)]
pub enum ItemOutcome {
    /// Transcript fetched and written during this run
    Created {
        /// Path of the new file
        path: PathBuf,
    },
    /// Transcript file already existed, nothing was fetched
    Skipped {
        /// Path of the existing file
        path: PathBuf,
    },
    /// Video could not be processed
    Failed {
        /// Why processing failed
        error: Error,
    },
}

/// Final result of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    /// Counters over all processed videos
    pub stats: RunStats,
    /// Whether the run was cut short by a shutdown signal
    pub interrupted: bool,
}
