//! Playlist page parsing (`ytInitialData` and browse continuations)

use crate::error::{PlaylistError, Result};
use crate::types::VideoRef;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static INITIAL_DATA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:var\s+ytInitialData|window\["ytInitialData"\])\s*=\s*"#)
        .expect("valid ytInitialData regex")
});

/// Videos and paging state found in one page of playlist data
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PlaylistPage {
    pub(crate) videos: Vec<VideoRef>,
    pub(crate) continuation: Option<String>,
    pub(crate) alert: Option<String>,
}

/// Parse the `ytInitialData` object embedded in a playlist page
pub(crate) fn extract_initial_data(html: &str) -> Result<Value> {
    let m = INITIAL_DATA_RE.find(html).ok_or_else(|| PlaylistError::Parse {
        reason: "ytInitialData not found".to_string(),
    })?;
    let rest = html[m.end()..].trim_start();
    // The object is followed by `;</script>`, so only the first value is read.
    serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| PlaylistError::Parse {
            reason: "ytInitialData is empty".to_string(),
        })?
        .map_err(|e| {
            PlaylistError::Parse {
                reason: format!("ytInitialData is not valid JSON: {e}"),
            }
            .into()
        })
}

/// Collect playlist entries, the next continuation token and any alert text
pub(crate) fn parse_page(data: &Value) -> PlaylistPage {
    let mut page = PlaylistPage::default();
    walk(data, &mut page);
    page
}

fn walk(value: &Value, page: &mut PlaylistPage) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                match key.as_str() {
                    "playlistVideoRenderer" => {
                        if let Some(video) = video_from_renderer(child) {
                            page.videos.push(video);
                        }
                    }
                    "continuationItemRenderer" => {
                        if let Some(token) = child
                            .pointer("/continuationEndpoint/continuationCommand/token")
                            .and_then(Value::as_str)
                        {
                            page.continuation = Some(token.to_string());
                        }
                    }
                    "alertRenderer" | "alertWithButtonRenderer" => {
                        if page.alert.is_none() {
                            page.alert = child.get("text").and_then(text_of);
                        }
                    }
                    _ => walk(child, page),
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, page);
            }
        }
        _ => {}
    }
}

fn video_from_renderer(renderer: &Value) -> Option<VideoRef> {
    let id = renderer.get("videoId")?.as_str()?;
    let title = renderer.get("title").and_then(text_of).unwrap_or_default();
    Some(VideoRef::new(id, title))
}

/// Text of a `{simpleText}` or `{runs: [{text}]}` object
fn text_of(value: &Value) -> Option<String> {
    if let Some(simple) = value.get("simpleText").and_then(Value::as_str) {
        return Some(simple.to_string());
    }
    let runs = value.get("runs")?.as_array()?;
    let text: String = runs
        .iter()
        .filter_map(|r| r.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}
