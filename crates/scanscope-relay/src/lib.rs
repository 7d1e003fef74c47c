//! Log relay server for scanscope
//!
//! This crate multiplexes the output of the monitored processes into one
//! server-sent event stream per subscriber, and serves the console's file,
//! upload and scan-trigger routes.

mod codec;
mod config;
mod error;
mod files;
mod process;
pub mod routes;
mod session;
mod trigger;
mod upload;

pub use codec::LogLineCodec;
pub use config::{DEFAULT_CONTAINER, DEFAULT_SCAN_LOG, RelayConfig, SourceSpec, StderrPolicy};
pub use error::{ApiError, RelayError, UploadError};
pub use files::{BlobStore, PathError, content_type};
pub use process::{ChildProcessHandle, ProcessState};
pub use routes::{AppState, build_router};
pub use session::{LogEventStream, RelaySession};
pub use trigger::{JenkinsConfig, JobTrigger};
pub use upload::{UploadSink, unique_name, validate_package_name};

// Re-export types used in our public API
pub use scanscope_types::{LogEvent, LogSource};
