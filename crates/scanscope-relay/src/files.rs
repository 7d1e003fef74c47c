use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::warn;

/// Reasons a requested relative path is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path contains a null byte")]
    NullByte,

    #[error("path is empty")]
    EmptyPath,

    #[error("absolute paths are not allowed")]
    AbsolutePath,

    #[error("path escapes the reports directory")]
    EscapesRoot,
}

/// Read-only view of the report/icon directory, keyed by relative path
#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `relative` under the root after normalizing `.` and `..`
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PathError> {
        let normalized = normalize_relative(relative)?;
        Ok(self.root.join(normalized))
    }

    /// Read a file, refusing anything that leaves the root.
    ///
    /// Symlinks are followed only when their target still lies inside the
    /// canonical root.
    pub async fn read(&self, relative: &str) -> Result<Option<Vec<u8>>, PathError> {
        let path = self.resolve(relative)?;

        let (Ok(root), Ok(target)) = (
            tokio::fs::canonicalize(&self.root).await,
            tokio::fs::canonicalize(&path).await,
        ) else {
            return Ok(None);
        };
        if !target.starts_with(&root) {
            warn!(path = %relative, "blocked symlink leaving reports directory");
            return Err(PathError::EscapesRoot);
        }

        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(_) => Ok(None),
        }
    }
}

/// Content type by extension; PDFs and PNG icons are what the store holds
pub fn content_type(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".png") {
        "image/png"
    } else {
        "application/octet-stream"
    }
}

fn normalize_relative(path: &str) -> Result<PathBuf, PathError> {
    if path.contains('\0') {
        warn!(path = %path.replace('\0', "\\0"), reason = "null_byte", "blocked file path");
        return Err(PathError::NullByte);
    }
    if path.is_empty() {
        return Err(PathError::EmptyPath);
    }

    let path_obj = Path::new(path);
    if path_obj.is_absolute() {
        warn!(path = %path, reason = "absolute_path", "blocked file path");
        return Err(PathError::AbsolutePath);
    }

    let mut normalized = PathBuf::new();
    for component in path_obj.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    warn!(path = %path, reason = "directory_escape", "blocked file path");
                    return Err(PathError::EscapesRoot);
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::AbsolutePath);
            }
        }
    }

    if normalized.as_os_str().is_empty() {
        return Err(PathError::EmptyPath);
    }
    Ok(normalized)
}
