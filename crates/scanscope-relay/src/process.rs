use std::process::Stdio;

use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

use scanscope_types::LogSource;

use crate::config::SourceSpec;
use crate::error::RelayError;

/// Lifecycle of a monitored process as seen by its session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Terminated,
}

/// One spawned log producer, owned by exactly one session
#[derive(Debug)]
pub struct ChildProcessHandle {
    source: LogSource,
    pid: Option<u32>,
    child: Child,
    state: ProcessState,
}

impl ChildProcessHandle {
    /// Spawn the process described by `launch` with piped stdout/stderr
    pub fn spawn(launch: &SourceSpec) -> Result<Self, RelayError> {
        let child = Command::new(&launch.program)
            .args(&launch.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RelayError::Spawn {
                command: launch.display(),
                source,
            })?;

        let pid = child.id();
        debug!(source = %launch.source, pid, command = %launch.display(), "spawned log process");

        Ok(Self {
            source: launch.source,
            pid,
            child,
            state: ProcessState::Running,
        })
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Take the stdout pipe (available once)
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the stderr pipe (available once)
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Send the kill signal. Returns `true` only for the call that did so.
    ///
    /// A process that already exited on its own counts as terminated without
    /// a signal being sent.
    pub fn terminate(&mut self) -> bool {
        if self.state == ProcessState::Terminated {
            return false;
        }
        self.state = ProcessState::Terminated;

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(source = %self.source, pid = self.pid, %status, "log process already exited");
                false
            }
            _ => {
                if let Err(e) = self.child.start_kill() {
                    warn!(source = %self.source, pid = self.pid, error = %e, "failed to kill log process");
                }
                true
            }
        }
    }

    /// Wait for the process to be reaped after `terminate`
    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }
}
