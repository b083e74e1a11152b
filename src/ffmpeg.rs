//! FFmpeg initialisation and log level control.
//!
//! FFmpeg prints its own warnings to stderr, separate from the Rust
//! [`log`](https://crates.io/crates/log) output. The server re-encodes every
//! processed video, so this module lets the binary quiet FFmpeg without
//! importing `ffmpeg-next` directly.
//!
//! # Example
//!
//! ```no_run
//! use vehicount::FfmpegLogLevel;
//!
//! let level: FfmpegLogLevel = "error".parse()?;
//! vehicount::set_ffmpeg_log_level(level);
//! # Ok::<(), vehicount::VehicountError>(())
//! ```

use std::str::FromStr;

use ffmpeg_next::util::log::Level;

use crate::error::VehicountError;

/// FFmpeg internal log verbosity level.
///
/// Ordered from quietest to most verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Only unrecoverable errors.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = VehicountError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "debug" => Ok(FfmpegLogLevel::Debug),
            other => Err(VehicountError::InvalidConfig(format!(
                "unsupported FFmpeg log level: {other}"
            ))),
        }
    }
}

/// Set the FFmpeg internal log verbosity level.
///
/// Does not affect Rust-side `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

/// Initialise FFmpeg. Safe to call repeatedly.
pub(crate) fn init() -> Result<(), VehicountError> {
    ffmpeg_next::init()
        .map_err(|error| VehicountError::FfmpegError(format!("initialisation failed: {error}")))
}
