//! Reconnecting subscription to the log relay
//!
//! [`StreamClient`] owns the transport and the retry timer, so at any moment
//! there is either an open subscription or a pending retry, never both. It
//! reports everything it observes as [`StreamUpdate`]s; the UI loop applies
//! them to a [`StreamView`], the single writer of the rolling buffer.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use scanscope_types::{DISCONNECTED_MESSAGE, LogEvent};

use crate::buffer::LogBuffer;
use crate::sse::SseDecoder;
use crate::transport::{Transport, TransportError};

/// Fixed delay between a transport failure and the next attempt
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connectivity of the client
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport and no pending retry
    #[default]
    Disconnected,
    /// Opening a subscription
    Connecting { attempt: u64 },
    /// Subscription open
    Connected,
    /// Waiting for the retry timer; no transport is open
    RetryScheduled { attempt: u64, retry_at: Instant },
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting { .. } => "connecting",
            Self::Connected => "connected",
            Self::RetryScheduled { .. } => "reconnecting",
        }
    }
}

/// What the client reports to the UI loop
#[derive(Clone, Debug, PartialEq)]
pub enum StreamUpdate {
    State(ConnectionState),
    Event(LogEvent),
}

/// Drives one subscription at a time, reconnecting forever
pub struct StreamClient<T> {
    transport: T,
    retry_delay: Duration,
    updates: mpsc::UnboundedSender<StreamUpdate>,
    state: ConnectionState,
    attempt: u64,
}

impl<T: Transport> StreamClient<T> {
    pub fn new(transport: T, updates: mpsc::UnboundedSender<StreamUpdate>) -> Self {
        Self {
            transport,
            retry_delay: RETRY_DELAY,
            updates,
            state: ConnectionState::Disconnected,
            attempt: 0,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Start the client on the current runtime; cancel the token to tear down
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Connect, follow, and reconnect until `cancel` fires.
    ///
    /// Cancellation drops any open transport and any pending retry timer.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            self.attempt += 1;
            self.set_state(ConnectionState::Connecting {
                attempt: self.attempt,
            });

            let opened = tokio::select! {
                _ = cancel.cancelled() => break,
                opened = self.transport.open() => opened,
            };

            let failure = match opened {
                Ok(mut stream) => {
                    self.on_open();
                    let mut decoder = SseDecoder::new();

                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                self.set_state(ConnectionState::Disconnected);
                                return;
                            }

                            chunk = stream.next() => {
                                match chunk {
                                    Some(Ok(bytes)) => {
                                        for payload in decoder.feed(&bytes) {
                                            self.on_payload(&payload);
                                        }
                                    }
                                    Some(Err(e)) => break e,
                                    None => break TransportError::Closed,
                                }
                            }
                        }
                    }
                    // `stream` dropped here: the failed transport is closed
                }
                Err(e) => e,
            };

            let retry_at = self.on_transport_error(&failure);

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(retry_at) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    fn on_open(&mut self) {
        info!(attempt = self.attempt, "connected to log stream");
        self.set_state(ConnectionState::Connected);
        self.emit(StreamUpdate::Event(LogEvent::connected()));
    }

    /// Decode one payload; malformed ones are dropped
    fn on_payload(&mut self, payload: &str) {
        match LogEvent::from_json(payload) {
            Ok(event) => self.emit(StreamUpdate::Event(event)),
            Err(e) => {
                debug!(error = %e, payload, "dropping malformed log payload");
            }
        }
    }

    /// Mark disconnected, note it locally, and schedule exactly one retry
    fn on_transport_error(&mut self, error: &TransportError) -> Instant {
        // The UI reports the outage itself; keep this below the console's level
        info!(error = %error, attempt = self.attempt, "log stream transport failed");
        self.set_state(ConnectionState::Disconnected);
        self.emit(StreamUpdate::Event(LogEvent::system(DISCONNECTED_MESSAGE)));

        let retry_at = Instant::now() + self.retry_delay;
        self.set_state(ConnectionState::RetryScheduled {
            attempt: self.attempt,
            retry_at,
        });
        retry_at
    }

    fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
        self.emit(StreamUpdate::State(state));
    }

    fn emit(&self, update: StreamUpdate) {
        // UI gone means we are being torn down anyway
        let _ = self.updates.send(update);
    }
}

/// UI-side state fed by [`StreamUpdate`]s
#[derive(Clone)]
pub struct StreamView {
    buffer: LogBuffer,
    state: ConnectionState,
}

impl StreamView {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            state: ConnectionState::Disconnected,
        }
    }

    /// Apply one update. Returns `true` when the buffer changed.
    pub fn apply(&mut self, update: StreamUpdate) -> bool {
        match update {
            StreamUpdate::State(state) => {
                self.state = state;
                false
            }
            StreamUpdate::Event(event) => {
                self.buffer.push(event);
                true
            }
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}
