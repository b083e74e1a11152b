//! Error types for the `vehicount` crate.
//!
//! This module defines [`VehicountError`], the unified error type returned by
//! every fallible operation in the crate. Each pipeline stage (upload,
//! download, audio stripping) has its own variant so the session can report
//! exactly which step failed.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `vehicount` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VehicountError {
    /// The uploaded file was rejected before anything was sent.
    #[error("Invalid upload {file_name:?}: {reason}")]
    InvalidUpload {
        /// File name supplied by the user.
        file_name: String,
        /// Why the upload was rejected.
        reason: String,
    },

    /// The configuration is unusable (bad backend URL, client build failure).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The upload request never produced a response.
    #[error("Failed to upload video to {url}: {reason}")]
    UploadFailed {
        /// Endpoint that was called.
        url: String,
        /// Transport or decoding failure.
        reason: String,
    },

    /// The backend answered with a non-success status.
    #[error("Backend returned status {status}: {message}")]
    BackendRejected {
        /// HTTP status code.
        status: u16,
        /// Error message reported by the backend.
        message: String,
    },

    /// The processed video could not be downloaded or saved.
    #[error("Failed to download video from {url}: {reason}")]
    DownloadFailed {
        /// URL that was requested.
        url: String,
        /// Underlying reason.
        reason: String,
    },

    /// Re-encoding the video without its audio track failed.
    #[error("Failed to strip audio from {path}: {reason}")]
    StripFailed {
        /// Input video path.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// A `data:` URL could not be parsed.
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// A page template referenced a value that was not supplied.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

impl From<FfmpegError> for VehicountError {
    fn from(error: FfmpegError) -> Self {
        VehicountError::FfmpegError(error.to_string())
    }
}
