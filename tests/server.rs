//! Web UI route tests.

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{CopyStripper, FakeBackend, Reply, spawn_backend};
use tempfile::TempDir;
use tower::util::ServiceExt;
use vehicount::{Session, server::router};

const BOUNDARY: &str = "vehicount-test-boundary";

async fn app(reply: Reply) -> (Router, FakeBackend, TempDir) {
    let backend = spawn_backend(reply).await;
    let scratch = tempfile::tempdir().unwrap();
    let config = backend.config(scratch.path());
    let session = Session::new(&config)
        .unwrap()
        .with_stripper(Arc::new(CopyStripper));
    (router(Arc::new(session), &config), backend, scratch)
}

fn processed() -> Reply {
    Reply::Processed {
        count: 7,
        frequency_data: vec![1, 2, 3],
        video: b"processed".to_vec(),
    }
}

fn multipart_upload(file_name: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn index_shows_form_and_prompt() {
    let (app, backend, _scratch) = app(processed()).await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("<form"));
    assert!(html.contains("Please upload a video file."));
    assert!(!html.contains("<video"));
    assert_eq!(backend.uploads(), 0);
}

#[tokio::test]
async fn upload_renders_player_and_download_link() {
    let (app, backend, scratch) = app(processed()).await;

    let response = app
        .oneshot(multipart_upload("traffic.mp4", b"raw video"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("Video Uploaded. Processing..."));
    assert!(html.contains("Total Vehicles Count: 7"));
    assert!(html.contains("<video id=\"myVideo\""));
    assert!(html.contains("\"Time: 10-15 seconds: 3 vehicles\""));
    assert!(html.contains("href=\"/download/v1.mp4_no_audio.mp4\""));
    assert!(html.contains("Download Processed Video"));
    assert_eq!(backend.uploads(), 1);
    assert!(scratch.path().join("v1.mp4_no_audio.mp4").is_file());
}

#[tokio::test]
async fn empty_file_part_counts_as_no_upload() {
    let (app, backend, _scratch) = app(processed()).await;

    let response = app.oneshot(multipart_upload("", b"")).await.unwrap();
    let html = body_text(response).await;

    assert!(html.contains("Please upload a video file."));
    assert_eq!(backend.uploads(), 0);
}

#[tokio::test]
async fn wrong_extension_is_rejected_locally() {
    let (app, backend, _scratch) = app(processed()).await;

    let response = app
        .oneshot(multipart_upload("notes.txt", b"hello"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("notice-error"));
    assert!(html.contains("only .mp4 and .avi files are accepted"));
    assert_eq!(backend.uploads(), 0);
}

#[tokio::test]
async fn backend_error_is_rendered() {
    let (app, _backend, _scratch) = app(Reply::Raw {
        status: 500,
        body: r#"{"error": "bad <format>"}"#.to_string(),
    })
    .await;

    let html = body_text(
        app.oneshot(multipart_upload("traffic.avi", b"raw"))
            .await
            .unwrap(),
    )
    .await;

    assert!(html.contains("Error processing video: bad &lt;format&gt;"));
    assert!(!html.contains("Download Processed Video"));
}

#[tokio::test]
async fn download_serves_attachment() {
    let (app, _backend, scratch) = app(processed()).await;
    std::fs::write(scratch.path().join("clip.mp4_no_audio.mp4"), b"video bytes").unwrap();

    let response = app
        .oneshot(get("/download/clip.mp4_no_audio.mp4"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"clip.mp4_no_audio.mp4\""
    );
    assert_eq!(body_text(response).await, "video bytes");
}

#[tokio::test]
async fn download_rejects_missing_and_unsafe_names() {
    let (app, _backend, scratch) = app(processed()).await;
    std::fs::write(scratch.path().join("ok.mp4"), b"x").unwrap();

    for uri in ["/download/missing.mp4", "/download/..", "/download/a%2Fok.mp4"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn serves_over_tcp() {
    let (app, backend, _scratch) = app(processed()).await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let part = reqwest::multipart::Part::bytes(b"raw video".to_vec())
        .file_name("traffic.mp4")
        .mime_str("video/mp4")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("video", part);
    let response = reqwest::Client::new()
        .post(format!("http://{address}/"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let html = response.text().await.unwrap();
    assert!(html.contains("Total Vehicles Count: 7"));
    assert_eq!(backend.uploads(), 1);
    assert_eq!(backend.downloads(), 1);

    let download = reqwest::get(format!("http://{address}/download/v1.mp4_no_audio.mp4"))
        .await
        .unwrap();
    assert_eq!(download.status(), reqwest::StatusCode::OK);
    assert_eq!(download.bytes().await.unwrap().as_ref(), b"processed");
}
