//! Player response and caption track parsing

use crate::error::{Result, TranscriptError};
use crate::types::{Transcript, TranscriptSnippet};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static TEXT_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<text\b([^>]*?)(?:/>|>(.*?)</text>)"#).expect("valid text element regex")
});

#[allow(clippy::expect_used)]
static START_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstart="([0-9.]+)""#).expect("valid start regex"));

#[allow(clippy::expect_used)]
static DUR_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bdur="([0-9.]+)""#).expect("valid dur regex"));

#[allow(clippy::expect_used)]
static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));

#[allow(clippy::expect_used)]
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity regex")
});

/// Subset of the innertube player response needed for captions
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerResponse {
    #[serde(default)]
    pub(crate) playability_status: Option<PlayabilityStatus>,
    #[serde(default)]
    pub(crate) captions: Option<Captions>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayabilityStatus {
    pub(crate) status: String,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer", default)]
    pub(crate) tracklist: Option<Tracklist>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Tracklist {
    #[serde(default)]
    pub(crate) caption_tracks: Vec<CaptionTrack>,
}

/// One caption track offered for a video
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CaptionTrack {
    pub(crate) base_url: String,
    pub(crate) language_code: String,
    #[serde(default)]
    pub(crate) name: Option<TrackName>,
    /// `"asr"` for speech-recognition tracks
    #[serde(default)]
    pub(crate) kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrackName {
    #[serde(default)]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Deserialize)]
struct TextRun {
    text: String,
}

impl CaptionTrack {
    pub(crate) fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    pub(crate) fn display_name(&self) -> String {
        self.name
            .as_ref()
            .and_then(|n| {
                n.simple_text
                    .clone()
                    .or_else(|| n.runs.first().map(|r| r.text.clone()))
            })
            .unwrap_or_else(|| self.language_code.clone())
    }

    /// URL of the timed-text XML for this track
    pub(crate) fn transcript_url(&self) -> String {
        self.base_url.replace("&fmt=srv3", "")
    }
}

/// Caption tracks of a playable video
///
/// Maps bot checks to [`TranscriptError::RequestBlocked`], any other
/// non-playable status to [`TranscriptError::VideoUnavailable`] and a missing
/// track list to [`TranscriptError::TranscriptsDisabled`].
pub(crate) fn caption_tracks(video_id: &str, response: PlayerResponse) -> Result<Vec<CaptionTrack>> {
    if let Some(status) = &response.playability_status
        && status.status != "OK"
    {
        let reason = status.reason.clone().unwrap_or_default();
        if status.status == "LOGIN_REQUIRED" && reason.contains("bot") {
            return Err(TranscriptError::RequestBlocked {
                video_id: video_id.to_string(),
            }
            .into());
        }
        return Err(TranscriptError::VideoUnavailable {
            video_id: video_id.to_string(),
            reason: if reason.is_empty() {
                status.status.clone()
            } else {
                reason
            },
        }
        .into());
    }

    let tracks = response
        .captions
        .and_then(|c| c.tracklist)
        .map(|t| t.caption_tracks)
        .unwrap_or_default();
    if tracks.is_empty() {
        return Err(TranscriptError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        }
        .into());
    }
    Ok(tracks)
}

/// Pick the track to download
///
/// With languages, each code is tried in order, manually created tracks
/// before generated ones. Without languages, the first manual track wins,
/// then the first track of any kind.
pub(crate) fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: Option<&[String]>,
) -> Option<&'a CaptionTrack> {
    match languages {
        Some(languages) => languages.iter().find_map(|code| {
            let matching = || tracks.iter().filter(move |t| &t.language_code == code);
            matching()
                .find(|t| !t.is_generated())
                .or_else(|| matching().next())
        }),
        None => tracks
            .iter()
            .find(|t| !t.is_generated())
            .or_else(|| tracks.first()),
    }
}

/// Parse timed-text XML into snippets
///
/// Markup inside a line is stripped and entities are decoded twice, since the
/// text is HTML escaped inside XML. Lines without text are dropped.
pub(crate) fn parse_transcript_xml(xml: &str) -> Vec<TranscriptSnippet> {
    TEXT_ELEMENT_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let raw = caps.get(2)?.as_str();
            let text = unescape_entities(&MARKUP_RE.replace_all(&unescape_entities(raw), ""));
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptSnippet {
                text: text.to_string(),
                start: parse_attr(&START_ATTR_RE, attrs),
                duration: parse_attr(&DUR_ATTR_RE, attrs),
            })
        })
        .collect()
}

/// Assemble a transcript from a selected track and its XML
pub(crate) fn build_transcript(video_id: &str, track: &CaptionTrack, xml: &str) -> Transcript {
    Transcript {
        video_id: video_id.to_string(),
        language_code: track.language_code.clone(),
        language: track.display_name(),
        is_generated: track.is_generated(),
        snippets: parse_transcript_xml(xml),
    }
}

fn parse_attr(re: &Regex, attrs: &str) -> f64 {
    re.captures(attrs)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0.0)
}

/// Decode named and numeric character references once
///
/// Unknown names are left as they are.
pub(crate) fn unescape_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}
