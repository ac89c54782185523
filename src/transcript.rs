//! Transcript retrieval seam

use crate::error::Result;
use crate::types::Transcript;
use async_trait::async_trait;

/// Source of video transcripts
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript of `video_id`
    ///
    /// With `Some(languages)`, only tracks in one of those languages qualify and
    /// earlier entries win. With `None`, any available track is acceptable.
    async fn fetch(&self, video_id: &str, languages: Option<&[String]>) -> Result<Transcript>;
}
