//! Per-run scratch directories for downloaded videos

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::CleanupError;

/// Scratch directory owned by a single pipeline run.
///
/// The directory lives at `<root>/<uuid>` and is only created when something
/// needs to be staged, so runs over local files leave no trace.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Allocate a fresh, not yet created, directory under `root`
    pub fn for_run(root: &Path) -> Self {
        Self {
            path: root.join(Uuid::new_v4().to_string()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the directory if it does not exist yet
    pub async fn ensure(&self) -> std::io::Result<&Path> {
        tokio::fs::create_dir_all(&self.path).await?;
        Ok(&self.path)
    }

    /// Remove the regular files directly inside the directory, then the directory.
    ///
    /// Subdirectories are left untouched, so the final removal fails if one is
    /// present.
    pub async fn cleanup(&self) -> Result<usize, CleanupError> {
        if !tokio::fs::try_exists(&self.path).await.map_err(|e| self.io_error(e))? {
            debug!("Scratch directory {} was never created", self.path.display());
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| self.io_error(e))? {
            let file_type = entry.file_type().await.map_err(|e| self.io_error(e))?;
            if file_type.is_file() {
                tokio::fs::remove_file(entry.path())
                    .await
                    .map_err(|e| self.io_error(e))?;
                removed += 1;
                debug!("🗑️ Removed scratch file: {}", entry.path().display());
            }
        }

        tokio::fs::remove_dir(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        info!("🧹 Cleaned up temporary files ({} removed)", removed);
        Ok(removed)
    }

    fn io_error(&self, source: std::io::Error) -> CleanupError {
        CleanupError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
