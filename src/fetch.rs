//! Downloading processed videos from the backend.
//!
//! The backend answers an upload with a path such as `/static/out.mp4`.
//! [`VideoFetcher`] resolves that path against the backend base URL and
//! streams the body into the scratch directory. Nothing verifies the bytes
//! beyond the HTTP status.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use reqwest::StatusCode;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::{
    backend::BackendClient,
    error::VehicountError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
};

/// Size of the write buffer the download is streamed through.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;

/// Streams processed videos into the scratch directory.
pub struct VideoFetcher {
    backend: BackendClient,
    scratch_dir: PathBuf,
    progress: Arc<dyn ProgressCallback>,
}

impl VideoFetcher {
    /// Create a fetcher writing into `scratch_dir`.
    ///
    /// The directory is created on first download if it does not exist.
    pub fn new(backend: BackendClient, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            scratch_dir: scratch_dir.into(),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Report downloaded bytes to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Directory downloads are written to.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Download `video_url` and return the local path.
    ///
    /// The file is named after the last path segment of `video_url`.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::DownloadFailed`] if the URL has no usable
    /// file name, the request fails, the status is not 200, or the file
    /// cannot be written.
    pub async fn fetch(&self, video_url: &str) -> Result<PathBuf, VehicountError> {
        let url = self.backend.endpoint(video_url);
        let failed = |reason: String| VehicountError::DownloadFailed {
            url: url.clone(),
            reason,
        };

        let file_name = scratch_file_name(video_url)
            .ok_or_else(|| failed("video URL has no file name".to_string()))?;

        log::info!("Downloading processed video from {url}");
        let mut response = self
            .backend
            .http_client()
            .get(&url)
            .send()
            .await
            .map_err(|error| failed(error.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(failed(format!("unexpected status {status}")));
        }

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|error| failed(format!("cannot create scratch directory: {error}")))?;

        let path = self.scratch_dir.join(file_name);
        let file = tokio::fs::File::create(&path)
            .await
            .map_err(|error| failed(format!("cannot create {}: {error}", path.display())))?;
        let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);

        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::Download,
            response.content_length(),
            DOWNLOAD_CHUNK_SIZE as u64,
        );

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| failed(error.to_string()))?
        {
            if chunk.is_empty() {
                continue;
            }
            writer
                .write_all(&chunk)
                .await
                .map_err(|error| failed(error.to_string()))?;
            tracker.advance(chunk.len() as u64);
        }

        writer
            .flush()
            .await
            .map_err(|error| failed(error.to_string()))?;
        tracker.finish();

        log::info!("Saved processed video to {}", path.display());
        Ok(path)
    }
}

/// Derive the scratch file name from a backend video path.
///
/// Takes the last path segment (ignoring any query or fragment) and replaces
/// every character outside `[A-Za-z0-9._-]` with `_`. Returns `None` when no
/// usable name remains (`""`, `"/"`, `".."`).
pub fn scratch_file_name(video_url: &str) -> Option<String> {
    let path = video_url.split(['?', '#']).next().unwrap_or_default();
    let base = path.rsplit('/').next().unwrap_or_default();

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        None
    } else {
        Some(sanitized)
    }
}
