//! Progress tracking for transfer batches

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::transfer::TransferOutcome;

/// Counts completed items of a batch and reports `completed/total`.
///
/// A report is due every `every` completions and always on the last one.
/// With a progress bar attached the bar carries the count instead of log
/// lines.
pub struct BatchProgress {
    label: &'static str,
    total: usize,
    every: usize,
    completed: AtomicUsize,
    succeeded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    bytes: AtomicU64,
    bar: Option<ProgressBar>,
    start_time: Instant,
}

impl BatchProgress {
    pub fn new(label: &'static str, total: usize, every: usize, show_bar: bool) -> Self {
        let bar = show_bar.then(|| {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb.set_message(label);
            pb
        });

        Self {
            label,
            total,
            every: every.max(1),
            completed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
            bar,
            start_time: Instant::now(),
        }
    }

    /// Record one finished item. Returns the completion count when a
    /// report was emitted for it.
    pub fn record(&self, outcome: &TransferOutcome) -> Option<usize> {
        match outcome {
            TransferOutcome::Skipped => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            TransferOutcome::Succeeded(bytes) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                self.bytes.fetch_add(*bytes, Ordering::Relaxed);
            }
            TransferOutcome::Failed(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(pb) = &self.bar {
            pb.set_position(completed as u64);
        }

        if completed % self.every == 0 || completed == self.total {
            if self.bar.is_none() {
                tracing::info!("[PROGRESS] {} {}/{}", self.label, completed, self.total);
            }
            Some(completed)
        } else {
            None
        }
    }

    /// Close the bar and snapshot the counters.
    pub fn finish(&self) -> BatchSummary {
        if let Some(pb) = &self.bar {
            pb.finish_with_message(format!("{} done", self.label));
        }
        BatchSummary {
            total: self.total,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_transferred: self.bytes.load(Ordering::Relaxed),
            duration: self.start_time.elapsed(),
        }
    }
}

/// Aggregate outcome of one transfer pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_transferred: u64,
    pub duration: Duration,
}

impl BatchSummary {
    pub fn completed(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    /// Get throughput in bytes per second
    pub fn throughput_bps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.bytes_transferred as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get human-readable throughput
    pub fn throughput_human(&self) -> String {
        let bps = self.throughput_bps();
        humansize::format_size(bps as u64, humansize::BINARY) + "/s"
    }

    pub fn describe(&self) -> String {
        format!(
            "{}/{} complete: {} transferred, {} skipped, {} failed ({} in {:.1?}, {})",
            self.completed(),
            self.total,
            self.succeeded,
            self.skipped,
            self.failed,
            humansize::format_size(self.bytes_transferred, humansize::BINARY),
            self.duration,
            self.throughput_human()
        )
    }
}
