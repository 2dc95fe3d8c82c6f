//! Per-operation temporary workspaces

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Private temporary directory owned by a single operation.
///
/// The directory and everything in it is removed when the workspace is
/// dropped, on success and error paths alike. Removal failures are logged
/// and never surfaced: the operation that owned the workspace has already
/// produced its result by then.
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a new workspace under the system temp directory.
    pub fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| Error::TempResourceFailed {
                reason: format!("Failed to create temporary directory: {}", e),
            })?;
        let path = dir.path().to_path_buf();
        tracing::debug!(path = %path.display(), "workspace created");

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Directory backing this workspace
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => tracing::debug!(path = %self.path.display(), "workspace removed"),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to remove temporary workspace"
                ),
            }
        }
    }
}
