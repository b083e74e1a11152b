//! # vehicount
//!
//! A small web UI for a remote vehicle-counting service.
//!
//! A user uploads a traffic video; `vehicount` forwards it to the backend,
//! downloads the annotated result, re-encodes it without audio using FFmpeg
//! via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, and
//! plays it back inline with an overlay showing how many vehicles passed in
//! each 5-second window.
//!
//! ## Quick Start
//!
//! ### Run the web UI
//!
//! ```no_run
//! use vehicount::{AppConfig, Session};
//!
//! # async fn run() -> Result<(), vehicount::VehicountError> {
//! let config = AppConfig::new("http://localhost:5000")?;
//! let session = Session::new(&config)?;
//! vehicount::server::serve(config, session).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Process one file
//!
//! ```no_run
//! use vehicount::{AppConfig, Session, UploadedVideo};
//!
//! # async fn run() -> Result<(), vehicount::VehicountError> {
//! let config = AppConfig::new("http://localhost:5000")?;
//! let upload = UploadedVideo::new("traffic.mp4", std::fs::read("traffic.mp4")?)?;
//! let report = Session::new(&config)?.run(Some(upload)).await;
//! println!("{:?} vehicles", report.vehicle_count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! 1. [`BackendClient::process_video`] uploads the file.
//! 2. [`VideoFetcher::fetch`] downloads the processed video.
//! 3. [`AudioStripper::strip`] writes a video-only copy.
//! 4. [`PlayerView`] embeds it as a `data:` URL with the overlay script.
//! 5. The page offers the final file for download.
//!
//! Each stage stops the run on failure and reports what went wrong.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the system.

pub mod backend;
pub mod config;
pub mod data_url;
pub mod error;
pub mod fetch;
pub mod ffmpeg;
pub mod frequency;
pub mod metadata;
pub mod page;
pub mod player;
pub mod probe;
pub mod progress;
pub mod server;
pub mod session;
pub mod strip;
pub mod template;
pub mod upload;

pub use backend::{BackendClient, ProcessingResult};
pub use config::AppConfig;
pub use data_url::{DataUrl, VIDEO_MP4};
pub use error::VehicountError;
pub use fetch::VideoFetcher;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frequency::{BucketWindow, END_OF_DATA, FrequencySeries};
pub use metadata::{MediaSummary, VideoSummary};
pub use page::render_page;
pub use player::PlayerView;
pub use probe::MediaProbe;
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use session::{DownloadLink, Notice, NoticeLevel, Session, SessionReport};
pub use strip::{AudioStripper, FfmpegStripper, stripped_path};
pub use template::Markup;
pub use upload::{MediaKind, UploadedVideo};
