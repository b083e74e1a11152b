//! The upload → count → download → strip → embed pipeline.
//!
//! [`Session::run`] drives one upload through every stage in order and
//! collects what the user should see in a [`SessionReport`]. A failing stage
//! adds its own error notice and ends the run; nothing is retried and later
//! stages never start.
//!
//! # Example
//!
//! ```no_run
//! use vehicount::{AppConfig, Session, UploadedVideo};
//!
//! # async fn run() -> Result<(), vehicount::VehicountError> {
//! let config = AppConfig::new("http://localhost:5000")?;
//! let session = Session::new(&config)?;
//! let upload = UploadedVideo::new("traffic.mp4", std::fs::read("traffic.mp4")?)?;
//! let report = session.run(Some(upload)).await;
//! for notice in &report.notices {
//!     println!("{:?}: {}", notice.level, notice.message);
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use crate::{
    backend::BackendClient,
    config::AppConfig,
    data_url::{DataUrl, VIDEO_MP4},
    error::VehicountError,
    fetch::VideoFetcher,
    frequency::FrequencySeries,
    player::PlayerView,
    strip::{AudioStripper, FfmpegStripper, stripped_path},
    template::Markup,
    upload::UploadedVideo,
};

/// Prompt shown when the form is submitted without a file.
pub const UPLOAD_PROMPT: &str = "Please upload a video file.";

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// A step completed.
    Success,
    /// Neutral information.
    Info,
    /// Nothing failed, but the run stopped early.
    Warning,
    /// A step failed.
    Error,
}

/// One user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Text shown to the user.
    pub message: String,
}

/// A finished video the user can download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    /// File name inside the scratch directory.
    pub file_name: String,
    /// Full local path.
    pub path: PathBuf,
}

impl DownloadLink {
    fn for_path(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            file_name,
            path: path.to_path_buf(),
        })
    }

    /// Server route that serves the file as an attachment.
    pub fn href(&self) -> String {
        format!("/download/{}", self.file_name)
    }
}

/// Everything a run produced for display.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    /// Messages in the order they were raised.
    pub notices: Vec<Notice>,
    /// Total vehicles reported by the backend.
    pub vehicle_count: Option<u64>,
    /// Per-bucket counts reported by the backend.
    pub frequency: Option<FrequencySeries>,
    /// Duration of the audio-free video.
    pub duration: Option<Duration>,
    /// Rendered player, present only when every stage succeeded.
    pub player: Option<Markup>,
    /// The final file, present only when every stage succeeded.
    pub download: Option<DownloadLink>,
}

impl SessionReport {
    /// A report holding a single error, e.g. for a rejected upload.
    pub fn from_error(error: &VehicountError) -> Self {
        let mut report = Self::default();
        report.push(NoticeLevel::Error, error.to_string());
        report
    }

    /// Whether any stage failed.
    pub fn has_errors(&self) -> bool {
        self.notices
            .iter()
            .any(|notice| notice.level == NoticeLevel::Error)
    }

    /// Messages of the given level.
    pub fn messages(&self, level: NoticeLevel) -> impl Iterator<Item = &str> {
        self.notices
            .iter()
            .filter(move |notice| notice.level == level)
            .map(|notice| notice.message.as_str())
    }

    fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }
}

/// Runs uploads through the pipeline.
///
/// A session holds no per-upload state, so one instance can serve many
/// concurrent requests.
pub struct Session {
    backend: BackendClient,
    fetcher: VideoFetcher,
    stripper: Arc<dyn AudioStripper>,
    bucket_seconds: u32,
}

impl Session {
    /// Create a session that strips audio with FFmpeg.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::InvalidConfig`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &AppConfig) -> Result<Self, VehicountError> {
        let backend = BackendClient::new(config)?;
        let fetcher = VideoFetcher::new(backend.clone(), config.scratch_dir());
        Ok(Self {
            backend,
            fetcher,
            stripper: Arc::new(FfmpegStripper::new()),
            bucket_seconds: config.bucket_seconds(),
        })
    }

    /// Replace the audio stripper.
    #[must_use]
    pub fn with_stripper(mut self, stripper: Arc<dyn AudioStripper>) -> Self {
        self.stripper = stripper;
        self
    }

    /// Replace the video fetcher (e.g. to attach a progress callback).
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: VideoFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// The backend client used for uploads.
    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Run one upload through every stage.
    ///
    /// Without an upload the report only carries [`UPLOAD_PROMPT`] and no
    /// request is made.
    pub async fn run(&self, upload: Option<UploadedVideo>) -> SessionReport {
        let mut report = SessionReport::default();

        let Some(upload) = upload else {
            report.push(NoticeLevel::Warning, UPLOAD_PROMPT);
            return report;
        };

        report.push(NoticeLevel::Success, "Video Uploaded. Processing...");

        let result = match self.backend.process_video(&upload).await {
            Ok(result) => result,
            Err(VehicountError::BackendRejected { message, .. }) => {
                report.push(
                    NoticeLevel::Error,
                    format!("Error processing video: {message}"),
                );
                return report;
            }
            Err(error) => {
                log::error!("Processing {} failed: {error}", upload.file_name());
                report.push(
                    NoticeLevel::Error,
                    format!("Error processing video: {error}"),
                );
                return report;
            }
        };

        report.vehicle_count = Some(result.count);
        let series = FrequencySeries::new(result.frequency_data, self.bucket_seconds);
        report.frequency = Some(series.clone());

        // The count is only shown alongside a processed video.
        let Some(video_url) = result.video_url.filter(|url| !url.trim().is_empty()) else {
            report.push(
                NoticeLevel::Warning,
                "The backend did not return a processed video.",
            );
            return report;
        };
        report.push(
            NoticeLevel::Info,
            format!("Total Vehicles Count: {}", result.count),
        );

        let local_path = match self.fetcher.fetch(&video_url).await {
            Ok(path) => path,
            Err(error) => {
                log::warn!("{error}");
                report.push(NoticeLevel::Error, "Failed to download video.");
                return report;
            }
        };

        let output_path = stripped_path(&local_path);
        let duration = match self.strip(local_path.clone(), output_path.clone()).await {
            Ok(duration) if duration.is_zero() => {
                log::warn!("{} has no playable frames", output_path.display());
                let error = VehicountError::StripFailed {
                    path: local_path,
                    reason: "re-encoded video is empty".to_string(),
                };
                report.push(NoticeLevel::Error, format!("Error removing audio: {error}"));
                return report;
            }
            Ok(duration) => duration,
            Err(error) => {
                log::warn!("{error}");
                report.push(NoticeLevel::Error, format!("Error removing audio: {error}"));
                return report;
            }
        };
        report.duration = Some(duration);

        let player = match tokio::fs::read(&output_path).await {
            Ok(bytes) => {
                PlayerView::new(DataUrl::encode(VIDEO_MP4, &bytes), series).render()
            }
            Err(error) => Err(VehicountError::IoError(error)),
        };
        match player {
            Ok(markup) => report.player = Some(markup),
            Err(error) => {
                log::error!("Rendering {} failed: {error}", output_path.display());
                report.push(
                    NoticeLevel::Error,
                    format!("Error rendering processed video: {error}"),
                );
                return report;
            }
        }

        report.download = DownloadLink::for_path(&output_path);
        report
    }

    async fn strip(&self, input: PathBuf, output: PathBuf) -> Result<Duration, VehicountError> {
        let stripper = self.stripper.clone();
        let path = input.clone();
        tokio::task::spawn_blocking(move || stripper.strip(&input, &output))
            .await
            .map_err(|error| VehicountError::StripFailed {
                path,
                reason: format!("worker thread failed: {error}"),
            })?
    }
}
