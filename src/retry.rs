//! Retry logic with exponential backoff
//!
//! Transcript fetches are retried with the preferred languages, waiting
//! `initial_delay * backoff_multiplier^k` after failed attempt `k` (1s, 2s, 4s
//! with the defaults). When the last attempt fails, one more fetch is made
//! without any language constraint before giving up.

use crate::config::RetryConfig;
use crate::error::Result;
use crate::transcript::TranscriptSource;
use crate::types::Transcript;
use crate::utils::truncate_chars;
use rand::Rng;
use std::time::Duration;

/// Maximum characters of an error message shown in retry warnings
const RETRY_MESSAGE_CHARS: usize = 50;

/// Delay to wait after failed attempt `attempt` (0-indexed), before jitter
///
/// # Examples
///
/// ```
/// use playlist_transcripts::config::RetryConfig;
/// use playlist_transcripts::retry::backoff_delay;
/// use std::time::Duration;
///
/// let config = RetryConfig::default();
/// assert_eq!(backoff_delay(&config, 0), Duration::from_secs(1));
/// assert_eq!(backoff_delay(&config, 2), Duration::from_secs(4));
/// ```
pub fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    Duration::try_from_secs_f64(secs)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Fetch a transcript, retrying with exponential backoff
///
/// Each of the `max_attempts` attempts asks `source` for one of `languages`.
/// After the last failed attempt a single unconstrained fetch is made. The
/// error of that fallback is returned if it fails too.
///
/// `max_attempts` of 0 is treated as 1.
pub async fn fetch_transcript_with_retry(
    source: &dyn TranscriptSource,
    video_id: &str,
    config: &RetryConfig,
    languages: &[String],
) -> Result<Transcript> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match source.fetch(video_id, Some(languages)).await {
            Ok(transcript) => {
                if attempt > 0 {
                    tracing::info!(
                        video_id,
                        attempts = attempt + 1,
                        "Transcript fetched after retry"
                    );
                }
                return Ok(transcript);
            }
            Err(e) if attempt + 1 < max_attempts => {
                let delay = backoff_delay(config, attempt);
                let delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                let message = e.to_string();
                tracing::warn!(
                    video_id,
                    category = %e.category(),
                    "  Retry {}/{} after {}s: {}",
                    attempt + 1,
                    max_attempts,
                    delay.as_secs_f64(),
                    truncate_chars(&message, RETRY_MESSAGE_CHARS)
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(
                    video_id,
                    error = %e,
                    "Preferred languages exhausted, trying any available transcript"
                );
                return match source.fetch(video_id, None).await {
                    Ok(transcript) => {
                        tracing::info!(
                            video_id,
                            language = %transcript.language_code,
                            "Fell back to a transcript outside the preferred languages"
                        );
                        Ok(transcript)
                    }
                    Err(fallback_err) => {
                        tracing::error!(
                            video_id,
                            error = %fallback_err,
                            "  ✗ No transcript available after {max_attempts} attempts"
                        );
                        Err(fallback_err)
                    }
                };
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result is uniformly distributed between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TranscriptError};
    use crate::types::TranscriptSnippet;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Fails the first `failures` constrained fetches, then succeeds
    struct ScriptedSource {
        failures: u32,
        fallback_succeeds: bool,
        calls: Mutex<Vec<(Option<Vec<String>>, Instant)>>,
    }

    impl ScriptedSource {
        fn new(failures: u32, fallback_succeeds: bool) -> Self {
            Self {
                failures,
                fallback_succeeds,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(Option<Vec<String>>, Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn transcript(video_id: &str, language_code: &str) -> Transcript {
        Transcript {
            video_id: video_id.to_string(),
            language_code: language_code.to_string(),
            language: language_code.to_string(),
            is_generated: false,
            snippets: vec![TranscriptSnippet {
                text: "hello".to_string(),
                start: 0.0,
                duration: 1.0,
            }],
        }
    }

    #[async_trait]
    impl TranscriptSource for ScriptedSource {
        async fn fetch(&self, video_id: &str, languages: Option<&[String]>) -> Result<Transcript> {
            let constrained_so_far = {
                let mut calls = self.calls.lock().unwrap();
                let count = calls.iter().filter(|(l, _)| l.is_some()).count() as u32;
                calls.push((languages.map(<[String]>::to_vec), Instant::now()));
                count
            };
            match languages {
                Some(_) if constrained_so_far < self.failures => {
                    Err(Error::Http {
                        status: 503,
                        url: format!("https://www.youtube.com/watch?v={video_id}"),
                    })
                }
                Some(_) => Ok(transcript(video_id, "en")),
                None if self.fallback_succeeds => Ok(transcript(video_id, "de")),
                None => Err(TranscriptError::TranscriptsDisabled {
                    video_id: video_id.to_string(),
                }
                .into()),
            }
        }
    }

    fn english() -> Vec<String> {
        vec!["en".to_string(), "en-US".to_string()]
    }

    fn config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            ..RetryConfig::default()
        }
    }

    #[test]
    fn backoff_doubles_from_one_second() {
        let config = RetryConfig::default();
        assert_eq!(backoff_delay(&config, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(&config, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(&config, 2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_capped_at_max_delay() {
        let config = RetryConfig {
            max_delay: Duration::from_secs(3),
            ..RetryConfig::default()
        };
        assert_eq!(backoff_delay(&config, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(&config, 2), Duration::from_secs(3));
        assert_eq!(backoff_delay(&config, 40), Duration::from_secs(3));
        assert_eq!(backoff_delay(&config, u32::MAX), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_does_not_wait() {
        let source = ScriptedSource::new(0, false);
        let start = Instant::now();

        let result = fetch_transcript_with_retry(&source, "vid", &config(3), &english()).await;

        assert_eq!(result.unwrap().language_code, "en");
        assert_eq!(source.calls().len(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_preferred_languages() {
        let source = ScriptedSource::new(2, false);

        let result = fetch_transcript_with_retry(&source, "vid", &config(3), &english()).await;

        assert_eq!(result.unwrap().language_code, "en");
        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(l, _)| l.as_deref() == Some(&english()[..])));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_one_two_four_seconds_between_attempts() {
        let source = ScriptedSource::new(u32::MAX, false);

        let _ = fetch_transcript_with_retry(&source, "vid", &config(4), &english()).await;

        let calls = source.calls();
        // 4 constrained attempts + 1 fallback
        assert_eq!(calls.len(), 5);
        let gaps: Vec<Duration> = calls
            .windows(2)
            .map(|w| w[1].1.duration_since(w[0].1))
            .collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                // fallback follows the last failure immediately
                Duration::ZERO,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_fall_back_to_any_language() {
        let source = ScriptedSource::new(u32::MAX, true);

        let result = fetch_transcript_with_retry(&source, "vid", &config(3), &english()).await;

        assert_eq!(result.unwrap().language_code, "de");
        let calls = source.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[..3].iter().all(|(l, _)| l.is_some()));
        assert!(calls[3].0.is_none(), "last call must be unconstrained");
    }

    #[tokio::test(start_paused = true)]
    async fn total_failure_returns_the_fallback_error() {
        let source = ScriptedSource::new(u32::MAX, false);

        let err = fetch_transcript_with_retry(&source, "vid", &config(3), &english())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Transcript(TranscriptError::TranscriptsDisabled { .. })
        ));
        assert_eq!(source.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn single_attempt_still_tries_fallback() {
        let source = ScriptedSource::new(u32::MAX, false);
        let start = Instant::now();

        let result = fetch_transcript_with_retry(&source, "vid", &config(1), &english()).await;

        assert!(result.is_err());
        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].0.is_some());
        assert!(calls[1].0.is_none());
        assert_eq!(start.elapsed(), Duration::ZERO, "no backoff with one attempt");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_behaves_like_one() {
        let source = ScriptedSource::new(u32::MAX, true);

        let result = fetch_transcript_with_retry(&source, "vid", &config(0), &english()).await;

        assert!(result.is_ok());
        assert_eq!(source.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_keeps_delay_between_base_and_double() {
        let config = RetryConfig {
            max_attempts: 2,
            jitter: true,
            ..RetryConfig::default()
        };
        let source = ScriptedSource::new(u32::MAX, false);

        let _ = fetch_transcript_with_retry(&source, "vid", &config, &english()).await;

        let calls = source.calls();
        let gap = calls[1].1.duration_since(calls[0].1);
        assert!(gap >= Duration::from_secs(1), "gap {gap:?} below base delay");
        assert!(gap <= Duration::from_secs(2), "gap {gap:?} above 2x base delay");
    }

    #[test]
    fn add_jitter_stays_within_bounds_over_many_iterations() {
        let delay = Duration::from_millis(50);
        for i in 0..200 {
            let jittered = add_jitter(delay);
            assert!(
                jittered >= delay,
                "iteration {i}: jittered {jittered:?} < base delay {delay:?}"
            );
            assert!(
                jittered <= delay * 2,
                "iteration {i}: jittered {jittered:?} > 2x base delay {:?}",
                delay * 2
            );
        }
    }

    #[test]
    fn add_jitter_on_zero_delay_returns_zero() {
        assert_eq!(add_jitter(Duration::ZERO), Duration::ZERO);
    }
}
