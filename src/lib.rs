//! # playlist-transcripts
//!
//! Bulk transcript downloader for YouTube playlists.
//!
//! Every video of a playlist is processed in order: if its transcript file
//! already exists it is skipped, otherwise the transcript is fetched (retrying
//! with exponential backoff, then falling back to any language) and written as
//! plain text to `[<video id>] - <title>.txt`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlist_transcripts::{Downloader, RunConfig, YouTubeClient, run_with_shutdown};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::from_env()?;
//!     let client = Arc::new(YouTubeClient::new(&config)?);
//!     let downloader = Downloader::new(config, client.clone(), client);
//!
//!     let report = run_with_shutdown(&downloader).await?;
//!     println!("{} transcripts written", report.stats.success);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Run configuration
pub mod config;
/// Run orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Logging setup
pub mod logging;
/// Playlist URL validation and resolution
pub mod playlist;
/// Per-video processing
pub mod processor;
/// Retry logic with exponential backoff
pub mod retry;
/// Outcome counters and summary
pub mod stats;
/// Transcript retrieval seam
pub mod transcript;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;
/// YouTube client
pub mod youtube;

// Re-export commonly used types
pub use config::{ProxyConfig, RetryConfig, RunConfig};
pub use downloader::Downloader;
pub use error::{Error, ErrorCategory, PlaylistError, Result, TranscriptError};
pub use playlist::PlaylistSource;
pub use stats::RunStats;
pub use transcript::TranscriptSource;
pub use types::{ItemOutcome, RunReport, Transcript, TranscriptSnippet, VideoRef};
pub use youtube::YouTubeClient;

use tokio_util::sync::CancellationToken;

/// Run the downloader until it finishes or a termination signal arrives.
///
/// On a signal a transcript fetch in flight is abandoned, a started file write
/// is finished, and the report of everything finished so far is returned with
/// `interrupted` set.
///
/// Ctrl+C (SIGINT) is honoured everywhere, SIGTERM on unix as well.
pub async fn run_with_shutdown(downloader: &Downloader) -> Result<RunReport> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            cancel.cancel();
        })
    };
    let result = downloader.run(cancel).await;
    watcher.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = wait_for_ctrl_c() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM unavailable, only Ctrl+C interrupts the run");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => {
            tracing::error!(error = %e, "Could not listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
