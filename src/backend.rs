//! Client for the remote vehicle-counting backend.
//!
//! The backend exposes a single `POST /process_video` endpoint that takes a
//! multipart upload and answers with the processed video's location, the
//! total vehicle count, and a per-bucket frequency series.
//!
//! # Example
//!
//! ```no_run
//! use vehicount::{AppConfig, BackendClient, UploadedVideo};
//!
//! # async fn run() -> Result<(), vehicount::VehicountError> {
//! let config = AppConfig::new("http://localhost:5000")?;
//! let client = BackendClient::new(&config)?;
//! let upload = UploadedVideo::new("traffic.mp4", std::fs::read("traffic.mp4")?)?;
//! let result = client.process_video(&upload).await?;
//! println!("{} vehicles", result.count);
//! # Ok(())
//! # }
//! ```

use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{config::AppConfig, error::VehicountError, upload::UploadedVideo};

/// Path of the processing endpoint, relative to the backend base URL.
pub const PROCESS_VIDEO_PATH: &str = "/process_video";

/// Multipart field the backend reads the video from.
pub const VIDEO_FIELD: &str = "video";

/// Successful response of `POST /process_video`.
///
/// Missing or `null` fields decode to their defaults so a partial answer
/// still reports whatever it carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Path of the processed video on the backend (e.g. `/static/out.mp4`).
    #[serde(default)]
    pub video_url: Option<String>,
    /// Total number of vehicles counted.
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    /// Vehicles per fixed-width time bucket, in playback order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub frequency_data: Vec<u64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client bound to one backend.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Build a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VehicountError::InvalidConfig`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &AppConfig) -> Result<Self, VehicountError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(|error| {
            VehicountError::InvalidConfig(format!("failed to build HTTP client: {error}"))
        })?;

        Ok(Self {
            http_client,
            base_url: config.backend_url().to_string(),
        })
    }

    /// Resolve a backend-relative path against the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Upload a video for processing.
    ///
    /// Sends one multipart request with the video in the `video` field. No
    /// retry is attempted.
    ///
    /// # Errors
    ///
    /// - [`VehicountError::UploadFailed`] if the request cannot be sent or
    ///   the success body is not valid JSON.
    /// - [`VehicountError::BackendRejected`] for any status other than 200,
    ///   carrying the backend's `error` message.
    pub async fn process_video(
        &self,
        upload: &UploadedVideo,
    ) -> Result<ProcessingResult, VehicountError> {
        let url = self.endpoint(PROCESS_VIDEO_PATH);
        log::info!(
            "Uploading {} ({} bytes) to {url}",
            upload.file_name(),
            upload.bytes().len()
        );

        let part = Part::bytes(upload.bytes().to_vec())
            .file_name(upload.file_name().to_string())
            .mime_str(upload.kind().mime_type())
            .map_err(|error| VehicountError::UploadFailed {
                url: url.clone(),
                reason: error.to_string(),
            })?;
        let form = Form::new().part(VIDEO_FIELD, part);

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|error| VehicountError::UploadFailed {
                url: url.clone(),
                reason: error.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let message = rejection_message(status, &body);
            log::warn!("Backend rejected {}: {status} {message}", upload.file_name());
            return Err(VehicountError::BackendRejected {
                status: status.as_u16(),
                message,
            });
        }

        let result = response
            .json::<ProcessingResult>()
            .await
            .map_err(|error| VehicountError::UploadFailed {
                url,
                reason: format!("invalid response body: {error}"),
            })?;

        log::debug!(
            "Backend counted {} vehicles over {} buckets",
            result.count,
            result.frequency_data.len()
        );
        Ok(result)
    }
}

/// Pick the most useful message out of a rejection body.
///
/// Prefers the JSON `error` field, then the raw body, then the status reason.
fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_str::<ErrorBody>(body) {
        return error;
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
