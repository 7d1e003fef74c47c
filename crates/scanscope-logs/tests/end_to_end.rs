//! A real relay on a loopback port followed by the stream client.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scanscope_logs::{
    ConnectionState, HttpTransport, LogBuffer, StreamClient, StreamUpdate, StreamView,
};
use scanscope_relay::{
    AppState, BlobStore, JenkinsConfig, JobTrigger, LogSource, RelayConfig, SourceSpec,
    UploadSink, build_router,
};
use scanscope_types::{CONNECTED_MESSAGE, DISCONNECTED_MESSAGE};

async fn start_relay(relay: RelayConfig, dir: &tempfile::TempDir) -> String {
    let app = build_router(AppState {
        relay: Arc::new(relay),
        files: BlobStore::new(dir.path().join("reports")),
        uploads: UploadSink::new(dir.path().join("uploads")),
        trigger: JobTrigger::new(JenkinsConfig::default()),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/api/logs/stream")
}

/// Apply updates until `done` holds for the view
async fn follow_until(
    rx: &mut mpsc::UnboundedReceiver<StreamUpdate>,
    view: &mut StreamView,
    done: impl Fn(&StreamView) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(update) = rx.recv().await {
            view.apply(update);
            if done(view) {
                return;
            }
        }
    })
    .await
    .expect("client did not reach the expected state");
}

#[cfg(unix)]
#[tokio::test]
async fn test_client_receives_tagged_lines_and_spawn_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let relay = RelayConfig::new(vec![
        SourceSpec::new(
            LogSource::MobsfDocker,
            "sh",
            ["-c", "echo 'build started'; sleep 30"],
        ),
        SourceSpec::new(
            LogSource::ScanScript,
            "/nonexistent/scan-log-follower",
            Vec::<String>::new(),
        ),
    ]);
    let url = start_relay(relay, &dir).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let client = StreamClient::new(HttpTransport::new(url).unwrap(), tx).spawn(cancel.clone());
    let mut view = StreamView::new(LogBuffer::default());

    follow_until(&mut rx, &mut view, |v| {
        v.buffer().all().iter().any(|e| e.message == "build started")
    })
    .await;

    let events = view.buffer().all();
    assert!(view.state().is_connected());

    // Local connect event, then the relay's own
    assert_eq!(events[0].source, LogSource::System);
    assert_eq!(events[0].message, CONNECTED_MESSAGE);
    assert_eq!(events[1].source, LogSource::System);
    assert_eq!(events[1].message, CONNECTED_MESSAGE);

    let diagnostics: Vec<_> = events
        .iter()
        .filter(|e| e.message.starts_with("Error accessing scan logs:"))
        .collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].source, LogSource::System);

    let last = events.last().unwrap();
    assert_eq!(last.source, LogSource::MobsfDocker);
    assert_eq!(last.message, "build started");
    assert!(!events.iter().any(|e| e.source == LogSource::ScanScript));

    cancel.cancel();
    client.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_relay_schedules_one_retry() {
    // Grab a free port, then close it so connecting is refused
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let transport = HttpTransport::new(format!("http://{addr}/api/logs/stream")).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let client = StreamClient::new(transport, tx).spawn(cancel.clone());
    let mut view = StreamView::new(LogBuffer::default());

    follow_until(&mut rx, &mut view, |v| {
        matches!(v.state(), ConnectionState::RetryScheduled { .. })
    })
    .await;

    let events = view.buffer().all();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].source, LogSource::System);
    assert_eq!(events[0].message, DISCONNECTED_MESSAGE);

    cancel.cancel();
    client.await.unwrap();
    assert_eq!(view.buffer().len(), 1);
}
