//! Outcome counters and the end-of-run summary

use crate::types::ItemOutcome;
use std::path::Path;

const RULE_WIDTH: usize = 60;

/// Counters over the outcomes of one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Number of videos in the playlist
    pub total: usize,
    /// Transcripts written during this run
    pub success: usize,
    /// Transcripts that already existed
    pub skipped: usize,
    /// Videos that could not be processed
    pub failed: usize,
}

impl RunStats {
    /// Start counting for a playlist of `total` videos
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Count one outcome
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Created { .. } => self.success += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// Number of outcomes recorded so far
    pub fn processed(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    /// Share of videos that have a transcript file, in percent
    ///
    /// `None` for an empty playlist.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some((self.success + self.skipped) as f64 / self.total as f64 * 100.0)
    }

    /// Lines of the summary block, without the surrounding rules
    pub fn summary_lines(&self, output_dir: &Path) -> Vec<String> {
        let mut lines = vec![
            "DOWNLOAD SUMMARY:".to_string(),
            format!("  Total Videos:  {}", self.total),
            format!("  Successful:    {}", self.success),
            format!("  Skipped:       {}", self.skipped),
            format!("  Failed:        {}", self.failed),
        ];
        if let Some(rate) = self.success_rate() {
            lines.push(format!("  Success Rate:  {rate:.1}%"));
        }
        lines.push(format!("  Output:        {}/", output_dir.display()));
        lines
    }

    /// Log the summary block
    pub fn log_summary(&self, output_dir: &Path) {
        let rule = "=".repeat(RULE_WIDTH);
        tracing::info!("{rule}");
        for line in self.summary_lines(output_dir) {
            tracing::info!("{line}");
        }
        tracing::info!("{rule}");
    }
}
