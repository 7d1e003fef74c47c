use std::path::PathBuf;

use serde::Deserialize;

use scanscope_types::LogSource;

/// Default container followed by `docker logs -f`
pub const DEFAULT_CONTAINER: &str = "mobsf";

/// Default append-only log written by the scan script
pub const DEFAULT_SCAN_LOG: &str = "mobsf_scans.log";

/// Events buffered between the process readers and the stream writer
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// What to do with lines a monitored process writes to stderr
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StderrPolicy {
    /// Log locally through `tracing` only; the client never sees them
    #[default]
    Diagnostics,
    /// Forward each line to the client as a `System` event
    Forward,
}

/// A monitored process: which source it feeds and how to launch it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceSpec {
    pub source: LogSource,
    pub program: String,
    pub args: Vec<String>,
}

impl SourceSpec {
    pub fn new<I, S>(source: LogSource, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source,
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `docker logs -f <container>`
    pub fn docker_logs(container: &str) -> Self {
        Self::new(LogSource::MobsfDocker, "docker", ["logs", "-f", container])
    }

    /// `tail -f <path>`
    pub fn tail_file(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self::new(
            LogSource::ScanScript,
            "tail",
            ["-f".to_string(), path.to_string_lossy().into_owned()],
        )
    }

    /// Command line for diagnostics
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Settings shared by every relay session
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Processes spawned for each subscription
    pub sources: Vec<SourceSpec>,

    /// Handling of child stderr
    pub stderr: StderrPolicy,

    /// Capacity of the per-session event channel
    pub channel_capacity: usize,
}

impl RelayConfig {
    pub fn new(sources: Vec<SourceSpec>) -> Self {
        Self {
            sources,
            stderr: StderrPolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// The two standard sources: the scanner container and the scan log file
    pub fn standard(container: &str, scan_log: impl Into<PathBuf>) -> Self {
        Self::new(vec![
            SourceSpec::docker_logs(container),
            SourceSpec::tail_file(scan_log),
        ])
    }

    pub fn with_stderr(mut self, policy: StderrPolicy) -> Self {
        self.stderr = policy;
        self
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::standard(DEFAULT_CONTAINER, DEFAULT_SCAN_LOG)
    }
}
