//! Log stream client for scanscope
//!
//! This crate provides the rolling event buffer, source and text filters,
//! and the reconnecting subscription to the relay's event stream.

mod buffer;
mod client;
mod filter;
mod sse;
mod transport;

pub use buffer::{DEFAULT_CAPACITY, LogBuffer, SourceCounts};
pub use client::{ConnectionState, RETRY_DELAY, StreamClient, StreamUpdate, StreamView};
pub use filter::{CompiledFilter, SourceFilter};
pub use sse::SseDecoder;
pub use transport::{EventByteStream, HttpTransport, Transport, TransportError};

// Re-export types used in our public API
pub use scanscope_types::{LogEvent, LogSource};
