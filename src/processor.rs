//! Per-video processing: skip, fetch, format, write

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::retry::fetch_transcript_with_retry;
use crate::transcript::TranscriptSource;
use crate::types::{ItemOutcome, VideoRef};
use crate::utils::{sanitize_filename, transcript_path, truncate_chars};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Maximum characters of a title shown in progress lines
const TITLE_LOG_CHARS: usize = 50;

/// Maximum characters of an error message shown for a failed video
const ERROR_LOG_CHARS: usize = 80;

/// Process one video of the playlist
///
/// `index` is 1-based. Existing transcript files are never refetched or
/// overwritten. Every failure is logged and returned as [`ItemOutcome::Failed`]
/// so the caller can move on to the next video.
///
/// `cancel` only interrupts the transcript fetch and the rate-limit pause. A
/// fetched transcript is always written out in full. Returns `None` when the
/// fetch was interrupted; nothing is written in that case.
pub async fn process_video(
    config: &RunConfig,
    source: &dyn TranscriptSource,
    video: &VideoRef,
    index: usize,
    total: usize,
    cancel: &CancellationToken,
) -> Option<ItemOutcome> {
    match try_process_video(config, source, video, index, total, cancel).await {
        Ok(outcome) => outcome,
        Err(error) => {
            let message = error.to_string();
            tracing::error!(
                video_id = %video.id,
                category = %error.category(),
                "[{index}/{total}] ✗ Error: {}",
                truncate_chars(&message, ERROR_LOG_CHARS)
            );
            Some(ItemOutcome::Failed { error })
        }
    }
}

async fn try_process_video(
    config: &RunConfig,
    source: &dyn TranscriptSource,
    video: &VideoRef,
    index: usize,
    total: usize,
    cancel: &CancellationToken,
) -> Result<Option<ItemOutcome>> {
    if video.id.trim().is_empty() {
        return Err(Error::InvalidVideo(format!(
            "empty video identifier for {:?}",
            video.title
        )));
    }

    let title = sanitize_filename(&video.title);
    let short_title = truncate_chars(&title, TITLE_LOG_CHARS);
    let path = transcript_path(&config.output_dir, video);

    if tokio::fs::try_exists(&path).await? {
        tracing::info!("[{index}/{total}] Skipping (exists): {short_title}...");
        return Ok(Some(ItemOutcome::Skipped { path }));
    }

    tracing::info!("[{index}/{total}] Processing: {short_title}...");

    let fetched = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        result = fetch_transcript_with_retry(source, &video.id, &config.retry, &config.languages) => Some(result),
    };
    let Some(result) = fetched else {
        tracing::info!("[{index}/{total}] Interrupted while fetching: {short_title}...");
        return Ok(None);
    };
    let transcript = result?;
    let text = transcript.to_plain_text();

    if !write_new_file(&path, &text).await? {
        tracing::info!("[{index}/{total}] Skipping (appeared while fetching): {short_title}...");
        return Ok(Some(ItemOutcome::Skipped { path }));
    }

    tracing::info!(
        video_id = %video.id,
        language = %transcript.language_code,
        generated = transcript.is_generated,
        "  ✓ Saved successfully"
    );

    if !config.rate_limit_delay.is_zero() {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(config.rate_limit_delay) => {}
        }
    }

    Ok(Some(ItemOutcome::Created { path }))
}

/// Write `contents` to `path` only if the file does not exist yet
///
/// Returns `false` without touching the file when it already exists. A file
/// left incomplete by a failed write is removed again.
async fn write_new_file(path: &Path, contents: &str) -> Result<bool> {
    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    let written = async {
        file.write_all(contents.as_bytes()).await?;
        file.flush().await
    }
    .await;
    if let Err(e) = written {
        drop(file);
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %remove_err, "Could not remove incomplete transcript file");
        }
        return Err(e.into());
    }
    Ok(true)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::error::TranscriptError;
    use crate::types::{Transcript, TranscriptSnippet};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedSource {
        result: std::result::Result<Vec<&'static str>, ()>,
        calls: AtomicU32,
    }

    impl FixedSource {
        fn ok(lines: Vec<&'static str>) -> Self {
            Self {
                result: Ok(lines),
                calls: AtomicU32::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TranscriptSource for FixedSource {
        async fn fetch(&self, video_id: &str, _languages: Option<&[String]>) -> Result<Transcript> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(lines) => Ok(Transcript {
                    video_id: video_id.to_string(),
                    language_code: "en".to_string(),
                    language: "English".to_string(),
                    is_generated: false,
                    snippets: lines
                        .iter()
                        .enumerate()
                        .map(|(i, text)| TranscriptSnippet {
                            text: text.to_string(),
                            start: i as f64,
                            duration: 1.0,
                        })
                        .collect(),
                }),
                Err(()) => Err(TranscriptError::TranscriptsDisabled {
                    video_id: video_id.to_string(),
                }
                .into()),
            }
        }
    }

    fn test_config(dir: &TempDir) -> RunConfig {
        RunConfig {
            output_dir: dir.path().to_path_buf(),
            retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                ..RetryConfig::default()
            },
            rate_limit_delay: Duration::ZERO,
            ..RunConfig::default()
        }
    }

    #[tokio::test]
    async fn writes_new_transcript_file() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let source = FixedSource::ok(vec!["first line", "second line"]);
        let video = VideoRef::new("abc123", "Intro: Networking/Basics");

        let outcome = process_video(&config, &source, &video, 1, 1, &CancellationToken::new())
            .await
            .unwrap();

        let expected = dir.path().join("[abc123] - Intro_ Networking_Basics.txt");
        match outcome {
            ItemOutcome::Created { path } => assert_eq!(path, expected),
            other => panic!("expected Created, got {other:?}"),
        }
        let contents = std::fs::read_to_string(&expected).unwrap();
        assert_eq!(contents, "first line\nsecond line");
    }

    #[tokio::test]
    async fn existing_file_is_skipped_without_fetching() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let source = FixedSource::ok(vec!["new content"]);
        let video = VideoRef::new("abc123", "Title");
        let path = transcript_path(dir.path(), &video);
        std::fs::write(&path, "old content").unwrap();

        let outcome = process_video(&config, &source, &video, 2, 5, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, ItemOutcome::Skipped { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old content");
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let source = FixedSource::ok(vec!["line"]);
        let video = VideoRef::new("id", "Title");

        let first = process_video(&config, &source, &video, 1, 1, &CancellationToken::new())
            .await
            .unwrap();
        let second = process_video(&config, &source, &video, 1, 1, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(first, ItemOutcome::Created { .. }));
        assert!(matches!(second, ItemOutcome::Skipped { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let source = FixedSource::failing();
        let video = VideoRef::new("id", "Title");

        let outcome = process_video(&config, &source, &video, 1, 1, &CancellationToken::new())
            .await
            .unwrap();

        match outcome {
            ItemOutcome::Failed { error } => assert!(matches!(
                error,
                Error::Transcript(TranscriptError::TranscriptsDisabled { .. })
            )),
            other => panic!("expected Failed, got {other:?}"),
        }
        // 2 attempts + fallback
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn empty_video_id_fails_validation() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let source = FixedSource::ok(vec!["line"]);
        let video = VideoRef::new("  ", "Title");

        let outcome = process_video(&config, &source, &video, 1, 1, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ItemOutcome::Failed {
                error: Error::InvalidVideo(_)
            }
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_output_dir_is_a_filesystem_failure() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.output_dir = dir.path().join("does-not-exist");
        let source = FixedSource::ok(vec!["line"]);
        let video = VideoRef::new("id", "Title");

        let outcome = process_video(&config, &source, &video, 1, 1, &CancellationToken::new())
            .await
            .unwrap();

        match outcome {
            ItemOutcome::Failed { error } => {
                assert_eq!(error.category(), crate::error::ErrorCategory::Filesystem)
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pauses_for_rate_limit_after_write() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.rate_limit_delay = Duration::from_millis(500);
        let source = FixedSource::ok(vec!["line"]);
        let start = tokio::time::Instant::now();

        let video = VideoRef::new("id", "T");
        let outcome = process_video(&config, &source, &video, 1, 1, &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(outcome, ItemOutcome::Created { .. }));
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn write_new_file_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.txt");

        assert!(write_new_file(&path, "one").await.unwrap());
        assert!(!write_new_file(&path, "two").await.unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one");
    }

    /// Cancels the token from inside the fetch, then either hangs or returns a transcript
    struct CancellingSource {
        token: CancellationToken,
        hang: bool,
    }

    #[async_trait]
    impl TranscriptSource for CancellingSource {
        async fn fetch(&self, video_id: &str, _languages: Option<&[String]>) -> Result<Transcript> {
            self.token.cancel();
            if self.hang {
                std::future::pending::<()>().await;
            }
            Ok(Transcript {
                video_id: video_id.to_string(),
                language_code: "en".to_string(),
                language: "English".to_string(),
                is_generated: false,
                snippets: vec![TranscriptSnippet {
                    text: "complete text".to_string(),
                    start: 0.0,
                    duration: 1.0,
                }],
            })
        }
    }

    #[tokio::test]
    async fn cancelled_fetch_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let token = CancellationToken::new();
        let source = CancellingSource {
            token: token.clone(),
            hang: true,
        };

        let outcome = process_video(&config, &source, &VideoRef::new("id", "T"), 1, 1, &token).await;

        assert!(outcome.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cancellation_after_fetch_still_writes_the_whole_file() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        // The interrupt also cuts the rate-limit pause short
        config.rate_limit_delay = Duration::from_secs(3600);
        let video = VideoRef::new("id", "T");

        // Repeated because the interrupt used to race the blocking file open
        for _ in 0..50 {
            let _ = std::fs::remove_file(transcript_path(dir.path(), &video));
            let token = CancellationToken::new();
            let source = CancellingSource {
                token: token.clone(),
                hang: false,
            };
            let outcome = process_video(&config, &source, &video, 1, 1, &token).await;

            assert!(matches!(outcome, Some(ItemOutcome::Created { .. })));
            assert_eq!(
                std::fs::read_to_string(transcript_path(dir.path(), &video)).unwrap(),
                "complete text"
            );
        }
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_existing_files_as_usual() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let source = FixedSource::ok(vec!["line"]);
        let video = VideoRef::new("id", "Title");
        std::fs::write(transcript_path(dir.path(), &video), "old").unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = process_video(&config, &source, &video, 1, 1, &token).await;

        assert!(matches!(outcome, Some(ItemOutcome::Skipped { .. })));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
