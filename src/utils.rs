//! Utility functions for file naming and log formatting

use crate::types::VideoRef;
use std::path::{Path, PathBuf};

/// Characters that are illegal in filenames on at least one major platform
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Replace every filesystem-illegal character with `_`
///
/// # Examples
///
/// ```
/// use playlist_transcripts::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC: Live?"), "AC_DC_ Live_");
/// ```
#[must_use]
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if ILLEGAL_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// File name of a video's transcript: `[{id}] - {sanitized title}.txt`
#[must_use]
pub fn transcript_file_name(video: &VideoRef) -> String {
    format!("[{}] - {}.txt", video.id, sanitize_filename(&video.title))
}

/// Full path of a video's transcript inside `output_dir`
#[must_use]
pub fn transcript_path(output_dir: &Path, video: &VideoRef) -> PathBuf {
    output_dir.join(transcript_file_name(video))
}

/// Cut `text` to at most `max_chars` characters, never splitting a code point
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
