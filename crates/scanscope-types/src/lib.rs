//! Shared types for scanscope
//!
//! This crate contains the log event model shared by the relay server and
//! the stream client, along with its wire encoding.

use std::fmt;

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// Message announcing a fresh subscription, sent by both relay and client
pub const CONNECTED_MESSAGE: &str = "Connected to log stream";

/// Message appended locally by the client when the transport drops
pub const DISCONNECTED_MESSAGE: &str = "Disconnected from log stream. Attempting to reconnect...";

// ============================================================================
// Log Sources
// ============================================================================

/// Origin of a log event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogSource {
    /// Control events produced by the relay or the client itself
    #[serde(rename = "system")]
    System,
    /// Output of the scanner container (`docker logs -f`)
    #[serde(rename = "mobsf-docker")]
    MobsfDocker,
    /// Output of the scan script's log file (`tail -f`)
    #[serde(rename = "scan-script")]
    ScanScript,
}

impl LogSource {
    /// Wire name, as it appears in the JSON payload
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::MobsfDocker => "mobsf-docker",
            Self::ScanScript => "scan-script",
        }
    }

    /// Human readable label used in diagnostics
    pub fn label(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::MobsfDocker => "Docker logs",
            Self::ScanScript => "scan logs",
        }
    }

    /// Get display color for this source
    pub fn color(&self) -> Color {
        match self {
            Self::System => Color::Yellow,
            Self::MobsfDocker => Color::Blue,
            Self::ScanScript => Color::Green,
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Events
// ============================================================================

/// A single tagged log line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Producer of this line
    pub source: LogSource,

    /// Assignment time at the relay (or at the client for local events)
    pub timestamp: DateTime<Utc>,

    /// The line itself
    pub message: String,
}

impl LogEvent {
    /// Create an event stamped with the current wall-clock time
    pub fn new(source: LogSource, message: impl Into<String>) -> Self {
        Self::at(source, Utc::now(), message)
    }

    /// Create an event with an explicit timestamp
    pub fn at(source: LogSource, timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            source,
            timestamp,
            message: message.into(),
        }
    }

    /// Create a `System` event
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(LogSource::System, message)
    }

    /// The announcement sent when a subscription opens
    pub fn connected() -> Self {
        Self::system(CONNECTED_MESSAGE)
    }

    /// Encode as the JSON payload carried by one stream event
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decode one stream payload
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}
