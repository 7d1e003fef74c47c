use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::RelayConfig;
use crate::error::{ApiError, UploadError};
use crate::files::{BlobStore, content_type};
use crate::session::RelaySession;
use crate::trigger::JobTrigger;
use crate::upload::{UploadSink, validate_package_name};

/// Largest accepted package upload
pub const MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayConfig>,
    pub files: BlobStore,
    pub uploads: UploadSink,
    pub trigger: JobTrigger,
}

/// Build the HTTP surface of the relay
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs/stream", get(log_stream))
        .route("/api/files/{*path}", get(serve_file))
        .route(
            "/api/upload-ipa",
            post(upload_ipa).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/trigger-scan", post(trigger_scan))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /api/logs/stream`: one relay session per subscriber.
///
/// The session lives inside the response stream; when the client goes away
/// the stream is dropped and both processes are killed.
pub async fn log_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = serde_json::Result<Event>>> {
    info!("log stream subscriber connected");
    let events = RelaySession::stream(&state.relay)
        .map(|event| event.to_json().map(|data| Event::default().data(data)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// `GET /api/files/{*path}`: reports and icons
pub async fn serve_file(
    Path(path): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let bytes = state.files.read(&path).await?.ok_or(ApiError::FileNotFound)?;
    Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response())
}

/// `POST /api/upload-ipa`: multipart field `file`
pub async fn upload_ipa(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            return Err(UploadError::NoFile);
        };
        // Reject before buffering the body
        validate_package_name(&filename)?;

        let bytes = field.bytes().await?;
        let stored = state.uploads.store(&filename, &bytes).await?;
        return Ok(Json(json!({ "success": true, "filename": stored })));
    }
    Err(UploadError::NoFile)
}

/// `POST /api/trigger-scan`
pub async fn trigger_scan(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.trigger.trigger().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Scan job triggered successfully",
    })))
}
