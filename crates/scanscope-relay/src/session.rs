//! Per-subscription supervisor for the monitored processes
//!
//! Each open stream gets its own [`RelaySession`]: it spawns one process per
//! configured source, forwards their stdout as tagged [`LogEvent`]s into a
//! single channel, and kills every process when the subscriber goes away.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use scanscope_types::{LogEvent, LogSource};

use crate::codec::LogLineCodec;
use crate::config::{RelayConfig, StderrPolicy};
use crate::process::ChildProcessHandle;

/// Owns the process pair behind one subscription
pub struct RelaySession {
    /// Cancels every reader task of this session
    cancel: CancellationToken,

    /// Spawned processes (sources that failed to spawn have none)
    handles: Vec<ChildProcessHandle>,

    /// Reader tasks for stdout and stderr
    tasks: Vec<JoinHandle<()>>,

    /// Keeps the event channel open while no reader is alive
    sender: Option<mpsc::Sender<LogEvent>>,

    closed: bool,
}

impl RelaySession {
    /// Spawn every configured source and start forwarding its output.
    ///
    /// The receiver yields the connect announcement first, then one
    /// diagnostic per source that failed to spawn, then process lines in
    /// arrival order.
    pub fn open(config: &RelayConfig) -> (Self, mpsc::Receiver<LogEvent>) {
        let capacity = config.channel_capacity.max(config.sources.len() + 1);
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();

        // Fresh channel with room for every startup event
        let _ = tx.try_send(LogEvent::connected());

        let mut session = Self {
            cancel,
            handles: Vec::with_capacity(config.sources.len()),
            tasks: Vec::new(),
            sender: Some(tx.clone()),
            closed: false,
        };

        for launch in &config.sources {
            match ChildProcessHandle::spawn(launch) {
                Ok(mut handle) => {
                    if let Some(stdout) = handle.take_stdout() {
                        session.tasks.push(spawn_stdout_reader(
                            launch.source,
                            stdout,
                            tx.clone(),
                            session.cancel.clone(),
                        ));
                    }
                    if let Some(stderr) = handle.take_stderr() {
                        session.tasks.push(spawn_stderr_reader(
                            launch.source,
                            stderr,
                            config.stderr,
                            tx.clone(),
                            session.cancel.clone(),
                        ));
                    }
                    session.handles.push(handle);
                }
                Err(e) => {
                    warn!(source = %launch.source, error = %e, "failed to spawn log process");
                    let _ = tx.try_send(LogEvent::system(format!(
                        "Error accessing {}: {}",
                        launch.source.label(),
                        e
                    )));
                }
            }
        }

        (session, rx)
    }

    /// Open a session and wrap it as a stream that closes it when dropped
    pub fn stream(config: &RelayConfig) -> LogEventStream {
        let (session, rx) = Self::open(config);
        LogEventStream { session, rx }
    }

    /// Kill every process and stop the readers.
    ///
    /// Returns `true` for the call that performed the shutdown; later calls
    /// do nothing.
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;

        self.cancel.cancel();
        for handle in &mut self.handles {
            handle.terminate();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.sender = None;

        info!(processes = self.handles.len(), "log session closed");
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Events of one session; dropping it closes the session
pub struct LogEventStream {
    session: RelaySession,
    rx: mpsc::Receiver<LogEvent>,
}

impl LogEventStream {
    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Close the session explicitly; buffered events can still be drained
    pub fn close(&mut self) -> bool {
        self.session.close()
    }
}

impl Stream for LogEventStream {
    type Item = LogEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<LogEvent>> {
        self.rx.poll_recv(cx)
    }
}

fn spawn_stdout_reader<R>(
    source: LogSource,
    reader: R,
    tx: mpsc::Sender<LogEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = FramedRead::new(reader, LogLineCodec::new());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                next = lines.next() => {
                    match next {
                        Some(Ok(line)) => {
                            if tx.send(LogEvent::new(source, line)).await.is_err() {
                                // Subscriber gone
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            warn!(%source, error = %e, "error reading log process output");
                            break;
                        }
                        None => {
                            info!(%source, "log process closed its output");
                            break;
                        }
                    }
                }
            }
        }
    })
}

fn spawn_stderr_reader<R>(
    source: LogSource,
    reader: R,
    policy: StderrPolicy,
    tx: mpsc::Sender<LogEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = FramedRead::new(reader, LogLineCodec::new());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                next = lines.next() => {
                    let Some(Ok(line)) = next else { break };
                    match policy {
                        // Operational noise stays out of the client narrative
                        StderrPolicy::Diagnostics => {
                            warn!(%source, stderr = %line, "log process stderr");
                        }
                        StderrPolicy::Forward => {
                            let event = LogEvent::system(format!("[{source}] {line}"));
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
        }
    })
}
