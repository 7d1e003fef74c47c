use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::error::UploadError;

/// Required suffix of an installable package
pub const PACKAGE_SUFFIX: &str = ".ipa";

/// Directory receiving manually uploaded packages
#[derive(Clone, Debug)]
pub struct UploadSink {
    dir: PathBuf,
}

impl UploadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate `filename`, then write `bytes` under a timestamp-prefixed name.
    ///
    /// Returns the stored file name.
    pub async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let name = validate_package_name(filename)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let stored = unique_name(Utc::now(), name);
        tokio::fs::write(self.dir.join(&stored), bytes).await?;

        info!(file = %stored, size = bytes.len(), "stored uploaded package");
        Ok(stored)
    }
}

/// Reduce a client-supplied name to its final component and check the suffix
pub fn validate_package_name(filename: &str) -> Result<&str, UploadError> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    if name.is_empty() || name == PACKAGE_SUFFIX {
        return Err(UploadError::InvalidFileType);
    }
    if !name.to_ascii_lowercase().ends_with(PACKAGE_SUFFIX) {
        return Err(UploadError::InvalidFileType);
    }
    Ok(name)
}

/// `2024-03-01T12-30-00-123Z_App.ipa`: ISO instant with `:` and `.` made file-safe
pub fn unique_name(now: DateTime<Utc>, name: &str) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{stamp}_{name}")
}
