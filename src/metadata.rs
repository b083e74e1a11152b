//! Media summary types.
//!
//! [`MediaSummary`] is what [`MediaProbe`](crate::MediaProbe) reports about a
//! file: enough to check that a stripped video really lost its audio and to
//! report its duration.

use std::time::Duration;

/// Container-level facts about a media file.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct MediaSummary {
    /// Total duration. Zero when the container does not record one.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"avi"`).
    pub format: String,
    /// Video stream details, if a video stream is present.
    pub video: Option<VideoSummary>,
    /// Number of audio streams.
    pub audio_streams: usize,
}

/// Details of the best video stream.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoSummary {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second. Zero if unknown.
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
}

impl MediaSummary {
    /// Whether the file carries any audio stream.
    pub fn has_audio(&self) -> bool {
        self.audio_streams > 0
    }

    /// Estimated frame count from duration and frame rate.
    pub fn estimated_frames(&self) -> Option<u64> {
        let fps = self.video.as_ref()?.frames_per_second;
        if fps <= 0.0 || self.duration.is_zero() {
            return None;
        }
        Some((self.duration.as_secs_f64() * fps).round() as u64)
    }
}
