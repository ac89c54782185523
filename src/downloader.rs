//! Run orchestration: resolve the playlist, process every video, summarize
//!
//! Videos are processed strictly one after another. A cancelled run abandons
//! a transcript fetch in flight but always finishes a file write it started,
//! then stops before the next video. The summary covers everything finished
//! before the signal.

use crate::config::RunConfig;
use crate::error::Result;
use crate::playlist::{PlaylistSource, resolve_playlist};
use crate::processor::process_video;
use crate::stats::RunStats;
use crate::transcript::TranscriptSource;
use crate::types::RunReport;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const RULE_WIDTH: usize = 60;

/// Bulk transcript downloader for one playlist
#[derive(Clone)]
pub struct Downloader {
    config: Arc<RunConfig>,
    playlists: Arc<dyn PlaylistSource>,
    transcripts: Arc<dyn TranscriptSource>,
}

impl Downloader {
    /// Create a downloader over the given sources
    pub fn new(
        config: RunConfig,
        playlists: Arc<dyn PlaylistSource>,
        transcripts: Arc<dyn TranscriptSource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            playlists,
            transcripts,
        }
    }

    /// The configuration this downloader runs with
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Download transcripts for every video of the configured playlist
    ///
    /// Invalid playlist URLs and unreachable playlists abort before the output
    /// directory is touched. Per-video failures are counted, never returned.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunReport> {
        let rule = "=".repeat(RULE_WIDTH);
        tracing::info!("{rule}");
        tracing::info!("YouTube Playlist Transcript Downloader");
        tracing::info!("{rule}");

        let resolved = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            videos = resolve_playlist(self.playlists.as_ref(), &self.config.playlist_url) => Some(videos?),
        };
        let Some(videos) = resolved else {
            tracing::warn!("Interrupted before the playlist was resolved");
            return Ok(RunReport {
                stats: RunStats::default(),
                interrupted: true,
            });
        };

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        tracing::info!("Output directory: {}/", self.config.output_dir.display());

        let total = videos.len();
        let mut stats = RunStats::new(total);
        let mut interrupted = false;

        tracing::info!("Starting transcript downloads...");
        tracing::info!("{}", "-".repeat(RULE_WIDTH));

        for (i, video) in videos.iter().enumerate() {
            if cancel.is_cancelled() {
                interrupted = true;
                break;
            }
            let outcome = process_video(
                &self.config,
                self.transcripts.as_ref(),
                video,
                i + 1,
                total,
                &cancel,
            )
            .await;
            let Some(outcome) = outcome else {
                interrupted = true;
                break;
            };
            stats.record(&outcome);
        }

        tracing::info!("{}", "-".repeat(RULE_WIDTH));
        stats.log_summary(&self.config.output_dir);
        if interrupted {
            tracing::warn!(
                processed = stats.processed(),
                total,
                "Process interrupted by user, remaining videos were not processed"
            );
        } else {
            tracing::info!("Transcript download process complete.");
        }

        Ok(RunReport { stats, interrupted })
    }
}
