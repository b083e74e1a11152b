//! Shared helpers: an in-process fake backend and stub audio strippers.

#![allow(dead_code)]

use std::{
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Multipart, Path as RoutePath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use vehicount::{AppConfig, AudioStripper, VehicountError};

/// Path the fake backend hands out for processed videos.
pub const PROCESSED_VIDEO_URL: &str = "/v1.mp4";

/// How the fake backend answers `/process_video`.
#[derive(Clone)]
pub enum Reply {
    /// 200 with a video URL that downloads `video`.
    Processed {
        count: u64,
        frequency_data: Vec<u64>,
        video: Vec<u8>,
    },
    /// 200 with a video URL that returns 404.
    BrokenDownload { count: u64 },
    /// Any status with a literal body.
    Raw { status: u16, body: String },
}

/// One multipart field received by the fake backend.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

struct BackendState {
    reply: Reply,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
    parts: Mutex<Vec<ReceivedPart>>,
}

/// Handle to a running fake backend.
pub struct FakeBackend {
    pub url: String,
    state: Arc<BackendState>,
}

impl FakeBackend {
    pub fn uploads(&self) -> usize {
        self.state.uploads.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.state.downloads.load(Ordering::SeqCst)
    }

    pub fn parts(&self) -> Vec<ReceivedPart> {
        self.state.parts.lock().unwrap().clone()
    }

    pub fn config(&self, scratch_dir: &Path) -> AppConfig {
        AppConfig::new(&self.url)
            .expect("fake backend URL is valid")
            .with_scratch_dir(scratch_dir)
    }
}

/// Start a fake backend on an ephemeral port.
pub async fn spawn_backend(reply: Reply) -> FakeBackend {
    let state = Arc::new(BackendState {
        reply,
        uploads: AtomicUsize::new(0),
        downloads: AtomicUsize::new(0),
        parts: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/process_video", post(process_video))
        .route("/:name", get(download))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake backend");
    let address = listener.local_addr().expect("Failed to read address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake backend stopped");
    });

    FakeBackend {
        url: format!("http://{address}"),
        state,
    }
}

async fn process_video(
    State(state): State<Arc<BackendState>>,
    mut multipart: Multipart,
) -> Response {
    state.uploads.fetch_add(1, Ordering::SeqCst);

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.map(|bytes| bytes.len()).unwrap_or(0);
        state.parts.lock().unwrap().push(ReceivedPart {
            name,
            file_name,
            content_type,
            len,
        });
    }

    match &state.reply {
        Reply::Processed {
            count,
            frequency_data,
            ..
        } => Json(json!({
            "video_url": PROCESSED_VIDEO_URL,
            "count": count,
            "frequency_data": frequency_data,
        }))
        .into_response(),
        Reply::BrokenDownload { count } => Json(json!({
            "video_url": PROCESSED_VIDEO_URL,
            "count": count,
            "frequency_data": [],
        }))
        .into_response(),
        Reply::Raw { status, body } => (
            StatusCode::from_u16(*status).expect("valid status"),
            body.clone(),
        )
            .into_response(),
    }
}

async fn download(
    State(state): State<Arc<BackendState>>,
    RoutePath(name): RoutePath<String>,
) -> Response {
    state.downloads.fetch_add(1, Ordering::SeqCst);

    match &state.reply {
        Reply::Processed { video, .. } if format!("/{name}") == PROCESSED_VIDEO_URL => {
            video.clone().into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Copies the input unchanged and reports a fixed duration.
pub struct CopyStripper;

pub const COPY_DURATION: Duration = Duration::from_secs(3);

impl AudioStripper for CopyStripper {
    fn strip(&self, input: &Path, output: &Path) -> Result<Duration, VehicountError> {
        std::fs::copy(input, output)?;
        Ok(COPY_DURATION)
    }
}

/// Always fails the way a file without a video stream would.
pub struct FailingStripper;

impl AudioStripper for FailingStripper {
    fn strip(&self, input: &Path, _output: &Path) -> Result<Duration, VehicountError> {
        Err(VehicountError::StripFailed {
            path: input.to_path_buf(),
            reason: "no video stream found".to_string(),
        })
    }
}

/// Writes an output but reports it as having no length.
pub struct EmptyOutputStripper;

impl AudioStripper for EmptyOutputStripper {
    fn strip(&self, _input: &Path, output: &Path) -> Result<Duration, VehicountError> {
        std::fs::write(output, b"")?;
        Ok(Duration::ZERO)
    }
}
