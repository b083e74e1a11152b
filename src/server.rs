//! The web UI.
//!
//! Routes:
//!
//! - `GET /` shows the upload form.
//! - `POST /` takes a multipart form with a `video` file, runs a
//!   [`Session`], and renders the result.
//! - `GET /download/:name` serves a finished video from the scratch
//!   directory as an attachment.

use std::{
    path::PathBuf,
    sync::Arc,
};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path as RoutePath, Request, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tower::util::ServiceExt;
use tower_http::services::ServeFile;

use crate::{
    backend::VIDEO_FIELD,
    config::AppConfig,
    error::VehicountError,
    fetch::scratch_file_name,
    page::render_page,
    session::{Session, SessionReport},
    upload::UploadedVideo,
};

#[derive(Clone)]
struct AppState {
    session: Arc<Session>,
    scratch_dir: Arc<PathBuf>,
}

/// Build the router for `session`, serving downloads from the configured
/// scratch directory.
pub fn router(session: Arc<Session>, config: &AppConfig) -> Router {
    let state = AppState {
        session,
        scratch_dir: Arc::new(config.scratch_dir().to_path_buf()),
    };

    Router::new()
        .route("/", get(index).post(upload))
        .route("/download/:name", get(download))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .with_state(state)
}

/// Bind the configured address and serve until the process ends.
///
/// # Errors
///
/// Returns [`VehicountError::IoError`] if the address cannot be bound or the
/// server stops with an I/O error.
pub async fn serve(config: AppConfig, session: Session) -> Result<(), VehicountError> {
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    log::info!("Forwarding uploads to {}", config.backend_url());

    axum::serve(listener, router(Arc::new(session), &config)).await?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> Response {
    render(&state.session.run(None).await)
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> Response {
    let report = match read_upload(multipart).await {
        Ok(upload) => state.session.run(upload).await,
        Err(error) => {
            log::warn!("Rejected upload: {error}");
            SessionReport::from_error(&error)
        }
    };
    render(&report)
}

async fn download(
    State(state): State<AppState>,
    RoutePath(name): RoutePath<String>,
    request: Request,
) -> Response {
    // Only names the fetcher could have produced; no separators, no `..`.
    if scratch_file_name(&name).as_deref() != Some(name.as_str()) {
        return (StatusCode::NOT_FOUND, "Video not found").into_response();
    }

    let path = state.scratch_dir.join(&name);
    if !path.is_file() {
        log::debug!("Download requested for missing {}", path.display());
        return (StatusCode::NOT_FOUND, "Video not found").into_response();
    }

    match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => {
            let mut response = response.into_response();
            if let Ok(disposition) =
                HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
            {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, disposition);
            }
            response
        }
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to serve file: {error}"),
        )
            .into_response(),
    }
}

fn render(report: &SessionReport) -> Response {
    match render_page(report) {
        Ok(page) => Html(page.into_string()).into_response(),
        Err(error) => {
            log::error!("Page rendering failed: {error}");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}

/// Pull the `video` file out of the form.
///
/// An absent field, or the empty part browsers send when no file was chosen,
/// counts as no upload.
async fn read_upload(mut multipart: Multipart) -> Result<Option<UploadedVideo>, VehicountError> {
    let malformed = |reason: String| VehicountError::InvalidUpload {
        file_name: String::new(),
        reason,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| malformed(error.to_string()))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| malformed(error.to_string()))?;

        if file_name.is_empty() && bytes.is_empty() {
            return Ok(None);
        }
        return UploadedVideo::new(file_name, bytes.to_vec()).map(Some);
    }

    Ok(None)
}
