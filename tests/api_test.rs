use std::path::{Path, PathBuf};

use tempfile::TempDir;
use video_rebrander::{AppState, Config};

/// A service instance bound to an ephemeral port with its own workspace.
struct TestServer {
    base_url: String,
    uploads_dir: PathBuf,
    outputs_dir: PathBuf,
    _workspace: TempDir,
}

impl TestServer {
    async fn spawn(mutate: impl FnOnce(&mut Config)) -> Self {
        let workspace = TempDir::new().expect("create workspace");
        let mut config = Config {
            workspace: workspace.path().to_string_lossy().into_owned(),
            ..Config::default()
        };
        mutate(&mut config);

        let state = AppState::new(&config).await.expect("create app state");
        let uploads_dir = state.uploads_dir().to_path_buf();
        let outputs_dir = state.outputs_dir().to_path_buf();

        let cors = video_rebrander::cors_layer(&config.origins());
        let app = video_rebrander::router(state, cors);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener port");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            uploads_dir,
            outputs_dir,
            _workspace: workspace,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn temp_file_count(&self) -> usize {
        count_files(&self.uploads_dir) + count_files(&self.outputs_dir)
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
}

fn video_form(bytes: Vec<u8>, filename: &str) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
    reqwest::multipart::Form::new().part("file", part)
}

#[tokio::test]
async fn health_reports_service_liveness() {
    let server = TestServer::spawn(|_| {}).await;

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert!(body["ffmpeg"].is_boolean());
}

#[tokio::test]
async fn presets_listing_reports_availability() {
    let server = TestServer::spawn(|_| {}).await;

    let response = reqwest::get(server.url("/api/presets")).await.unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let presets = body["presets"].as_array().unwrap();
    assert_eq!(presets.len(), 4);

    let none = presets.iter().find(|p| p["id"] == "none").unwrap();
    assert_eq!(none["available"], true);
    assert_eq!(none["name"], "Remove Only (No Logo)");
}

#[tokio::test]
async fn rejects_disallowed_extension_without_leaving_files() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/process-video"))
        .multipart(video_form(b"GIF89a".to_vec(), "animation.gif"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid file type"));
    assert_eq!(server.temp_file_count(), 0);
}

#[tokio::test]
async fn rejects_unknown_preset_and_cleans_staged_upload() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let form = video_form(vec![0u8; 64], "clip.mp4").text("logo_preset", "acme");
    let response = client
        .post(server.url("/api/process-video"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Invalid logo preset"));
    // The staged input was created before validation failed; it must be gone.
    assert_eq!(server.temp_file_count(), 0);
}

#[tokio::test]
async fn rejects_unknown_watermark_position() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let form = video_form(vec![0u8; 64], "clip.mp4").text("watermark_position", "center");
    let response = client
        .post(server.url("/api/process-video"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("Invalid watermark position")
    );
    assert_eq!(server.temp_file_count(), 0);
}

#[tokio::test]
async fn oversize_upload_is_aborted_during_staging() {
    let server = TestServer::spawn(|config| config.max_video_size_mb = 1).await;
    let client = reqwest::Client::new();

    let result = client
        .post(server.url("/api/process-video"))
        .multipart(video_form(vec![0u8; 2 * 1024 * 1024], "big.mp4"))
        .send()
        .await;

    // The server answers 413 mid-upload; depending on timing the client
    // may instead observe the aborted connection.
    if let Ok(response) = result {
        assert_eq!(response.status(), 413);
    }
    assert_eq!(server.temp_file_count(), 0);
}

#[tokio::test]
async fn unreadable_video_fails_processing_and_cleans_up() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    // Valid extension, garbage content: metadata probing cannot succeed
    // whether or not ffprobe is installed on the test host.
    let form = video_form(b"not a real mp4".to_vec(), "clip.mp4").text("logo_preset", "none");
    let response = client
        .post(server.url("/api/process-video"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("Processing failed"));
    assert_eq!(server.temp_file_count(), 0);
}

#[tokio::test]
async fn missing_file_field_is_a_validation_error() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let form = reqwest::multipart::Form::new().text("logo_preset", "none");
    let response = client
        .post(server.url("/api/process-video"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert_eq!(server.temp_file_count(), 0);
}

#[tokio::test]
async fn background_removal_validates_content_type() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let part = reqwest::multipart::Part::bytes(b"plain".to_vec())
        .file_name("note.txt")
        .mime_str("text/plain")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client
        .post(server.url("/api/remove-background"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn background_removal_without_delegate_is_bad_gateway() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let part = reqwest::multipart::Part::bytes(vec![0u8; 16])
        .file_name("photo.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = client
        .post(server.url("/api/remove-background"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn cleanup_endpoint_resets_the_workspace() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    std::fs::write(server.uploads_dir.join("stale.mp4"), b"stale").unwrap();
    std::fs::write(server.outputs_dir.join("stale_out.mp4"), b"stale").unwrap();
    assert_eq!(server.temp_file_count(), 2);

    let response = client
        .delete(server.url("/api/cleanup"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "cleaned");
    assert_eq!(server.temp_file_count(), 0);
    assert!(server.uploads_dir.is_dir());
    assert!(server.outputs_dir.is_dir());
}

#[tokio::test]
async fn every_job_response_carries_its_job_id() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/process-video"))
        .multipart(video_form(b"not a video".to_vec(), "clip.txt"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let job_id = response
        .headers()
        .get("x-job-id")
        .expect("job id header present")
        .to_str()
        .unwrap();
    uuid::Uuid::parse_str(job_id).expect("job id is a uuid");
}

#[tokio::test]
async fn configured_origins_receive_credentialed_cors_headers() {
    let server = TestServer::spawn(|_| {}).await;
    let client = reqwest::Client::new();

    let response = client
        .get(server.url("/health"))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get("access-control-allow-credentials").unwrap(),
        "true"
    );
}
