//! Application configuration.
//!
//! [`AppConfig`] is a builder that carries the backend location, scratch
//! directory, and server settings through the pipeline without a global.
//! The backend URL has no default and must always be supplied.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use vehicount::AppConfig;
//!
//! let config = AppConfig::new("https://counter.example.com/")?
//!     .with_scratch_dir("/tmp/vehicount")
//!     .with_timeout(Duration::from_secs(600));
//! assert_eq!(config.backend_url(), "https://counter.example.com");
//! # Ok::<(), vehicount::VehicountError>(())
//! ```

use std::{
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use crate::error::VehicountError;

/// Default scratch directory, relative to the working directory.
pub const DEFAULT_SCRATCH_DIR: &str = "temp";

/// Default listen port for the web UI.
pub const DEFAULT_PORT: u16 = 8501;

/// Default upload size limit (200 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Width of one frequency bucket, in seconds.
pub const DEFAULT_BUCKET_SECONDS: u32 = 5;

/// Configuration shared by the backend client, fetcher, session and server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    backend_url: String,
    scratch_dir: PathBuf,
    bind_address: SocketAddr,
    max_upload_bytes: usize,
    timeout: Option<Duration>,
    bucket_seconds: u32,
}

impl AppConfig {
    /// Create a configuration for the given backend base URL.
    ///
    /// A trailing `/` is trimmed so endpoint paths can be appended directly.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::InvalidConfig`] if the URL is empty, cannot
    /// be parsed, or does not use `http`/`https`.
    pub fn new(backend_url: impl Into<String>) -> Result<Self, VehicountError> {
        let backend_url = backend_url.into();
        let trimmed = backend_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(VehicountError::InvalidConfig(
                "backend URL must not be empty".to_string(),
            ));
        }

        let parsed = reqwest::Url::parse(trimmed).map_err(|error| {
            VehicountError::InvalidConfig(format!("invalid backend URL {trimmed:?}: {error}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(VehicountError::InvalidConfig(format!(
                "backend URL must use http or https, got {:?}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            backend_url: trimmed.to_string(),
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            bind_address: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            timeout: None,
            bucket_seconds: DEFAULT_BUCKET_SECONDS,
        })
    }

    /// Set the directory processed videos are written to.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Set the address the web UI listens on.
    #[must_use]
    pub fn with_bind_address(mut self, address: SocketAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Set the largest accepted upload, in bytes. Clamped to at least 1 KiB.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes.max(1024);
        self
    }

    /// Apply a timeout to every backend request. Unset by default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the frequency bucket width. Clamped to at least one second.
    #[must_use]
    pub fn with_bucket_seconds(mut self, seconds: u32) -> Self {
        self.bucket_seconds = seconds.max(1);
        self
    }

    /// Backend base URL without a trailing slash.
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Scratch directory for downloaded and stripped videos.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Listen address of the web UI.
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Upload size limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Per-request timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Frequency bucket width in seconds.
    pub fn bucket_seconds(&self) -> u32 {
        self.bucket_seconds
    }
}
