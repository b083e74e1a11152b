//! Backend client and video fetcher tests.

mod common;

use std::sync::{Arc, Mutex};

use common::{PROCESSED_VIDEO_URL, Reply, spawn_backend};
use vehicount::{
    BackendClient, OperationType, ProgressCallback, ProgressInfo, UploadedVideo, VehicountError,
    VideoFetcher,
};

fn upload() -> UploadedVideo {
    UploadedVideo::new("clip.AVI", vec![1, 2, 3, 4]).expect("valid upload")
}

// ── process_video ──────────────────────────────────────────────────

#[tokio::test]
async fn parses_successful_response() {
    let backend = spawn_backend(Reply::Processed {
        count: 12,
        frequency_data: vec![3, 0, 9],
        video: Vec::new(),
    })
    .await;
    let client = BackendClient::new(&backend.config(std::path::Path::new("unused"))).unwrap();

    let result = client.process_video(&upload()).await.unwrap();

    assert_eq!(result.video_url.as_deref(), Some(PROCESSED_VIDEO_URL));
    assert_eq!(result.count, 12);
    assert_eq!(result.frequency_data, vec![3, 0, 9]);

    let parts = backend.parts();
    assert_eq!(parts[0].content_type.as_deref(), Some("video/x-msvideo"));
}

#[tokio::test]
async fn missing_fields_take_defaults() {
    let backend = spawn_backend(Reply::Raw {
        status: 200,
        body: "{}".to_string(),
    })
    .await;
    let client = BackendClient::new(&backend.config(std::path::Path::new("unused"))).unwrap();

    let result = client.process_video(&upload()).await.unwrap();

    assert_eq!(result.video_url, None);
    assert_eq!(result.count, 0);
    assert!(result.frequency_data.is_empty());
}

#[tokio::test]
async fn malformed_success_body_is_upload_failure() {
    let backend = spawn_backend(Reply::Raw {
        status: 200,
        body: "<html>oops</html>".to_string(),
    })
    .await;
    let client = BackendClient::new(&backend.config(std::path::Path::new("unused"))).unwrap();

    match client.process_video(&upload()).await {
        Err(VehicountError::UploadFailed { reason, .. }) => {
            assert!(reason.starts_with("invalid response body"), "{reason}");
        }
        other => panic!("Expected UploadFailed, got: {other:?}"),
    }
}

#[tokio::test]
async fn rejection_messages() {
    let cases = [
        (500, r#"{"error": "bad format"}"#, "bad format"),
        (503, "  overloaded \n", "overloaded"),
        (400, "", "Bad Request"),
        (201, "{}", "{}"),
    ];

    for (status, body, expected) in cases {
        let backend = spawn_backend(Reply::Raw {
            status,
            body: body.to_string(),
        })
        .await;
        let client =
            BackendClient::new(&backend.config(std::path::Path::new("unused"))).unwrap();

        match client.process_video(&upload()).await {
            Err(VehicountError::BackendRejected {
                status: got,
                message,
            }) => {
                assert_eq!(got, status);
                assert_eq!(message, expected);
            }
            other => panic!("Expected BackendRejected for {status}, got: {other:?}"),
        }
    }
}

// ── fetch ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder(Mutex<Vec<ProgressInfo>>);

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.0.lock().unwrap().push(info.clone());
    }
}

#[tokio::test]
async fn fetch_streams_into_new_scratch_dir() {
    let video: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    let backend = spawn_backend(Reply::Processed {
        count: 1,
        frequency_data: vec![1],
        video: video.clone(),
    })
    .await;
    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().join("nested").join("temp");
    let client = BackendClient::new(&backend.config(&scratch)).unwrap();

    let recorder = Arc::new(Recorder::default());
    let fetcher = VideoFetcher::new(client, &scratch).with_progress(recorder.clone());
    let path = fetcher.fetch(PROCESSED_VIDEO_URL).await.unwrap();

    assert_eq!(path, scratch.join("v1.mp4"));
    assert_eq!(std::fs::read(&path).unwrap(), video);
    assert_eq!(backend.downloads(), 1);

    let infos = recorder.0.lock().unwrap();
    let last = infos.last().expect("at least one progress report");
    assert_eq!(last.operation, OperationType::Download);
    assert_eq!(last.current, video.len() as u64);
}

#[tokio::test]
async fn fetch_rejects_non_200() {
    let backend = spawn_backend(Reply::BrokenDownload { count: 0 }).await;
    let scratch = tempfile::tempdir().unwrap();
    let client = BackendClient::new(&backend.config(scratch.path())).unwrap();
    let fetcher = VideoFetcher::new(client, scratch.path());

    match fetcher.fetch(PROCESSED_VIDEO_URL).await {
        Err(VehicountError::DownloadFailed { url, reason }) => {
            assert_eq!(url, format!("{}{PROCESSED_VIDEO_URL}", backend.url));
            assert!(reason.contains("404"), "{reason}");
        }
        other => panic!("Expected DownloadFailed, got: {other:?}"),
    }
    assert!(!scratch.path().join("v1.mp4").exists());
}

#[tokio::test]
async fn fetch_rejects_nameless_url() {
    let backend = spawn_backend(Reply::BrokenDownload { count: 0 }).await;
    let scratch = tempfile::tempdir().unwrap();
    let client = BackendClient::new(&backend.config(scratch.path())).unwrap();
    let fetcher = VideoFetcher::new(client, scratch.path());

    assert!(matches!(
        fetcher.fetch("/static/").await,
        Err(VehicountError::DownloadFailed { .. })
    ));
    assert_eq!(backend.downloads(), 0);
}
