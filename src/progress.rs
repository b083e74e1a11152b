//! Progress reporting for the long-running pipeline steps.
//!
//! Downloading the processed video and re-encoding it without audio can take
//! a while. Both steps accept an optional [`ProgressCallback`]; the CLI plugs
//! a terminal progress bar into it, the server leaves it as a no-op.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vehicount::{FfmpegStripper, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let stripper = FfmpegStripper::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The step currently reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Downloading the processed video; units are bytes.
    Download,
    /// Re-encoding without audio; units are frames.
    AudioStrip,
}

/// A snapshot of progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// Units processed so far.
    pub current: u64,
    /// Total units expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the step started.
    pub elapsed: Duration,
}

/// Receives progress updates.
///
/// Callbacks are invoked from blocking worker threads, hence the `Send +
/// Sync` bound. They observe the work but cannot stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called as units of work complete.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. Used when no callback is configured.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing and fires the callback every `batch_size` units.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record `units` of completed work.
    pub(crate) fn advance(&mut self, units: u64) {
        self.current += units;
        self.since_last_report += units;

        if self.since_last_report >= self.batch_size {
            self.report();
            self.since_last_report = 0;
        }
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report();
    }

    fn report(&self) {
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| ((self.current as f32 / total as f32) * 100.0).min(100.0));

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
        });
    }
}
