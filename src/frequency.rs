//! Per-interval vehicle frequency series.
//!
//! The backend reports how many vehicles it saw in each fixed-width bucket
//! of the video (5 seconds by default). Bucket `i` covers playback time
//! `[i * width, (i + 1) * width)`. The series is not checked against the
//! real video length; times past the last bucket simply have no data.
//!
//! The in-page player receives [`FrequencySeries::overlay_labels`] and only
//! picks the label for the current bucket, so what it shows is exactly what
//! [`FrequencySeries::overlay_text`] returns.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Overlay text shown once playback passes the last bucket.
pub const END_OF_DATA: &str = "End of Data";

/// Vehicle counts per fixed-width time bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySeries {
    buckets: Vec<u64>,
    bucket_seconds: u32,
}

/// One bucket of a [`FrequencySeries`] together with its time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWindow {
    /// Position in the series.
    pub index: usize,
    /// Window start in seconds (inclusive).
    pub start_seconds: u64,
    /// Window end in seconds (exclusive).
    pub end_seconds: u64,
    /// Vehicles counted in the window.
    pub vehicles: u64,
}

impl Display for BucketWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Time: {}-{} seconds: {} vehicles",
            self.start_seconds, self.end_seconds, self.vehicles
        )
    }
}

impl FrequencySeries {
    /// Wrap the backend's series. A zero bucket width is treated as 1.
    pub fn new(buckets: Vec<u64>, bucket_seconds: u32) -> Self {
        Self {
            buckets,
            bucket_seconds: bucket_seconds.max(1),
        }
    }

    /// Raw per-bucket counts.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Bucket width in seconds.
    pub fn bucket_seconds(&self) -> u32 {
        self.bucket_seconds
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the backend reported no buckets at all.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket index for a playback position: `floor(seconds / width)`.
    ///
    /// Negative, NaN and infinite positions map to bucket 0.
    pub fn bucket_index(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (seconds / f64::from(self.bucket_seconds)).floor() as usize
    }

    /// The bucket covering a playback position, if the series reaches it.
    pub fn lookup(&self, seconds: f64) -> Option<BucketWindow> {
        let index = self.bucket_index(seconds);
        self.window(index)
    }

    /// Overlay text for a playback position.
    ///
    /// `"Time: X-Y seconds: N vehicles"` inside the series, otherwise
    /// [`END_OF_DATA`].
    pub fn overlay_text(&self, seconds: f64) -> String {
        match self.lookup(seconds) {
            Some(window) => window.to_string(),
            None => END_OF_DATA.to_string(),
        }
    }

    /// Overlay text for every bucket, indexed like [`buckets`](Self::buckets).
    ///
    /// Positions past the end show [`END_OF_DATA`] instead.
    pub fn overlay_labels(&self) -> Vec<String> {
        self.windows().map(|window| window.to_string()).collect()
    }

    /// Every bucket with its time window, in playback order.
    pub fn windows(&self) -> impl Iterator<Item = BucketWindow> + '_ {
        (0..self.buckets.len()).filter_map(|index| self.window(index))
    }

    fn window(&self, index: usize) -> Option<BucketWindow> {
        let vehicles = *self.buckets.get(index)?;
        let width = u64::from(self.bucket_seconds);
        Some(BucketWindow {
            index,
            start_seconds: index as u64 * width,
            end_seconds: (index as u64 + 1) * width,
            vehicles,
        })
    }
}
