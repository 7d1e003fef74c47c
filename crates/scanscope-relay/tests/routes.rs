use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use tower::ServiceExt;

use scanscope_relay::{
    AppState, BlobStore, JenkinsConfig, JobTrigger, LogEvent, LogSource, RelayConfig, SourceSpec,
    UploadSink, build_router,
};

/// Authorization header and raw query of each request the job server saw
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<(Option<String>, Option<String>)>>>);

impl Captured {
    fn push(&self, auth: Option<String>, query: Option<String>) {
        self.0.lock().unwrap().push((auth, query));
    }

    fn take(&self) -> Vec<(Option<String>, Option<String>)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

struct Fixture {
    reports: tempfile::TempDir,
    uploads: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            reports: tempfile::tempdir().unwrap(),
            uploads: tempfile::tempdir().unwrap(),
        }
    }

    fn app(&self, relay: RelayConfig, jenkins: JenkinsConfig) -> axum::Router {
        build_router(AppState {
            relay: Arc::new(relay),
            files: BlobStore::new(self.reports.path()),
            uploads: UploadSink::new(self.uploads.path().join("manual_ipa_uploads")),
            trigger: JobTrigger::new(jenkins),
        })
    }

    fn default_app(&self) -> axum::Router {
        self.app(RelayConfig::new(Vec::new()), JenkinsConfig::default())
    }
}

/// Send a request to the app and return (status, content type, body text).
async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, String, String) {
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, content_type, String::from_utf8_lossy(&body).into_owned())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "scanscope-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload-ipa")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ============================================================================
// Files
// ============================================================================

#[tokio::test]
async fn serves_report_pdf() {
    let fixture = Fixture::new();
    std::fs::create_dir(fixture.reports.path().join("batch_7")).unwrap();
    std::fs::write(fixture.reports.path().join("batch_7/report.pdf"), b"%PDF-1.4").unwrap();

    let (status, content_type, body) =
        send(fixture.default_app(), get("/api/files/batch_7/report.pdf")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "application/pdf");
    assert_eq!(body, "%PDF-1.4");
}

#[tokio::test]
async fn serves_icon_png() {
    let fixture = Fixture::new();
    std::fs::write(fixture.reports.path().join("icon.png"), b"\x89PNG").unwrap();

    let (status, content_type, _) = send(fixture.default_app(), get("/api/files/icon.png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type, "image/png");
}

#[tokio::test]
async fn missing_file_is_404() {
    let fixture = Fixture::new();
    let (status, _, body) = send(fixture.default_app(), get("/api/files/nope.pdf")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "File not found");
}

#[tokio::test]
async fn traversal_is_rejected() {
    let fixture = Fixture::new();
    let (status, _, body) = send(
        fixture.default_app(),
        get("/api/files/%2e%2e%2f%2e%2e%2fetc%2fpasswd"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.contains("root:"));
}

// ============================================================================
// Upload
// ============================================================================

#[tokio::test]
async fn upload_stores_package() {
    let fixture = Fixture::new();
    let (status, _, body) = send(
        fixture.default_app(),
        multipart("file", "Scanner.ipa", b"PK\x03\x04payload"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    let filename = json["filename"].as_str().unwrap();
    assert!(filename.ends_with("_Scanner.ipa"));

    let stored = fixture
        .uploads
        .path()
        .join("manual_ipa_uploads")
        .join(filename);
    assert_eq!(std::fs::read(stored).unwrap(), b"PK\x03\x04payload");
}

#[tokio::test]
async fn upload_rejects_wrong_type() {
    let fixture = Fixture::new();
    let (status, _, body) = send(
        fixture.default_app(),
        multipart("file", "Scanner.apk", b"data"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Invalid file type. Only IPA files are allowed.");
    assert!(!fixture.uploads.path().join("manual_ipa_uploads").exists());
}

#[tokio::test]
async fn upload_without_file_field() {
    let fixture = Fixture::new();
    let (status, _, body) = send(
        fixture.default_app(),
        multipart("attachment", "Scanner.ipa", b"data"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "No file provided");
}

// ============================================================================
// Scan trigger
// ============================================================================

/// Start a stand-in job server answering `status` and recording requests
async fn job_server(status: StatusCode) -> (String, Captured) {
    use axum::extract::{RawQuery, State};
    use axum::http::HeaderMap;

    let captured = Captured::default();
    let app = axum::Router::new()
        .route(
            "/job/{job}/buildWithParameters",
            axum::routing::post(
                move |State(captured): State<Captured>, headers: HeaderMap, RawQuery(query): RawQuery| async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    captured.push(auth, query);
                    (status, "queued")
                },
            ),
        )
        .with_state(captured.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), captured)
}

fn jenkins(url: String) -> JenkinsConfig {
    JenkinsConfig {
        url,
        user: Some("ops".to_string()),
        token: Some("s3cret".to_string()),
        ..Default::default()
    }
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn trigger_without_credentials() {
    let fixture = Fixture::new();
    let (status, _, body) = send(fixture.default_app(), post("/api/trigger-scan")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Jenkins credentials not configured");
}

#[tokio::test]
async fn trigger_posts_with_basic_auth() {
    let fixture = Fixture::new();
    let (url, captured) = job_server(StatusCode::CREATED).await;
    let app = fixture.app(RelayConfig::new(Vec::new()), jenkins(url));

    let (status, _, body) = send(app, post("/api/trigger-scan")).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Scan job triggered successfully");

    let requests = captured.take();
    assert_eq!(requests.len(), 1);
    let (auth, query) = &requests[0];
    // base64("ops:s3cret")
    assert_eq!(auth.as_deref(), Some("Basic b3BzOnMzY3JldA=="));
    assert_eq!(query.as_deref(), Some("token=START_SCAN&SCAN_TYPE=manual"));
}

#[tokio::test]
async fn trigger_mirrors_upstream_failure() {
    let fixture = Fixture::new();
    let (url, _captured) = job_server(StatusCode::FORBIDDEN).await;
    let app = fixture.app(RelayConfig::new(Vec::new()), jenkins(url));

    let (status, _, body) = send(app, post("/api/trigger-scan")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"], "Jenkins responded with status: 403");
    assert_eq!(json["details"], "queued");
}

// ============================================================================
// Log stream
// ============================================================================

/// Collect `data:` payloads until `count` events arrived
async fn read_events(body: Body, count: usize) -> Vec<LogEvent> {
    let mut stream = body.into_data_stream();
    let mut text = String::new();
    let mut events = Vec::new();

    while events.len() < count {
        let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for stream data")
            .expect("stream ended")
            .unwrap();
        text.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(end) = text.find("\n\n") {
            let frame: String = text.drain(..end + 2).collect();
            for line in frame.lines() {
                if let Some(payload) = line.strip_prefix("data:") {
                    events.push(LogEvent::from_json(payload.trim()).unwrap());
                }
            }
        }
    }
    events
}

#[cfg(target_os = "linux")]
fn process_gone(pid: &str) -> bool {
    // Missing, or a zombie waiting to be reaped
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

#[cfg(unix)]
#[tokio::test]
async fn stream_delivers_connect_then_process_lines() {
    let fixture = Fixture::new();
    let relay = RelayConfig::new(vec![
        SourceSpec::new(
            LogSource::MobsfDocker,
            "sh",
            ["-c", "echo 'build started'; sleep 30"],
        ),
        SourceSpec::new(LogSource::ScanScript, "/nonexistent/scanscope-tail", ["-f"]),
    ]);
    let app = fixture.app(relay, JenkinsConfig::default());

    let resp = app.oneshot(get("/api/logs/stream")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );

    let events = read_events(resp.into_body(), 3).await;
    assert_eq!(events[0].source, LogSource::System);
    assert_eq!(events[0].message, "Connected to log stream");
    assert_eq!(events[1].source, LogSource::System);
    assert!(events[1].message.starts_with("Error accessing scan logs:"));
    assert_eq!(events[2].source, LogSource::MobsfDocker);
    assert_eq!(events[2].message, "build started");
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn disconnect_kills_processes() {
    let fixture = Fixture::new();
    let pid_dir = tempfile::tempdir().unwrap();
    let script = |name: &str| {
        format!(
            "echo $$ > {}; echo ready; exec sleep 30",
            pid_dir.path().join(name).display()
        )
    };
    let relay = RelayConfig::new(vec![
        SourceSpec::new(LogSource::MobsfDocker, "sh", ["-c".to_string(), script("a")]),
        SourceSpec::new(LogSource::ScanScript, "sh", ["-c".to_string(), script("b")]),
    ]);
    let app = fixture.app(relay, JenkinsConfig::default());

    let resp = app.oneshot(get("/api/logs/stream")).await.unwrap();
    // connect + one "ready" per process; the body is dropped afterwards,
    // which is what a client disconnect looks like to the server
    let events = read_events(resp.into_body(), 3).await;
    assert_eq!(events.len(), 3);

    let pids: Vec<String> = ["a", "b"]
        .iter()
        .map(|name| read_pid(pid_dir.path(), name))
        .collect();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !pids.iter().all(|pid| process_gone(pid)) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "processes still alive after disconnect"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn read_pid(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name))
        .unwrap()
        .trim()
        .to_string()
}
