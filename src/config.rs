//! Relay configuration.
//!
//! Loaded from an optional TOML file; every field has a default, and the
//! job-trigger secrets can come from the environment instead of the file.
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:3000"
//! reports_dir = "mobsf_reports"
//! upload_dir = "manual_ipa_uploads"
//!
//! [sources]
//! docker_container = "mobsf"
//! scan_log_file = "mobsf_scans.log"
//! stderr = "diagnostics"
//!
//! [jenkins]
//! url = "http://localhost:8080"
//! job = "mobsf-scan-test"
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use scanscope_relay::{
    DEFAULT_CONTAINER, DEFAULT_SCAN_LOG, JenkinsConfig, RelayConfig, StderrPolicy,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub sources: SourceSettings,
    pub jenkins: JenkinsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    /// Root of the report PDFs and app icons served under `/api/files`
    pub reports_dir: PathBuf,
    /// Where uploaded packages are written
    pub upload_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 3000)),
            reports_dir: PathBuf::from("mobsf_reports"),
            upload_dir: PathBuf::from("manual_ipa_uploads"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub docker_container: String,
    pub scan_log_file: PathBuf,
    pub stderr: StderrPolicy,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            docker_container: DEFAULT_CONTAINER.to_string(),
            scan_log_file: PathBuf::from(DEFAULT_SCAN_LOG),
            stderr: StderrPolicy::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or defaults when no path is given.
    ///
    /// A path that was given but cannot be read or parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("no config file given, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            listen = %config.server.listen,
            container = %config.sources.docker_container,
            "loaded configuration"
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `JENKINS_URL`, `JENKINS_USER` and `JENKINS_API_TOKEN`
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| var(name).filter(|v| !v.is_empty());

        if let Some(url) = non_empty("JENKINS_URL") {
            self.jenkins.url = url;
        }
        if let Some(user) = non_empty("JENKINS_USER") {
            self.jenkins.user = Some(user);
        }
        if let Some(token) = non_empty("JENKINS_API_TOKEN") {
            self.jenkins.token = Some(token);
        }
    }

    pub fn relay(&self) -> RelayConfig {
        RelayConfig::standard(&self.sources.docker_container, &self.sources.scan_log_file)
            .with_stderr(self.sources.stderr)
    }
}
