use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::traits::RunError;

/// Exclusively owned scratch directory for one handler run.
///
/// Removed by [`WorkingDir::remove`] or, at the latest, when dropped.
#[derive(Debug)]
pub struct WorkingDir {
    path: PathBuf,
    removed: bool,
}

impl WorkingDir {
    /// Create `<root>/<prefix><uuid>`
    pub fn create(root: &Path, prefix: &str) -> Result<Self, RunError> {
        let path = root.join(format!("{prefix}{}", Uuid::new_v4()));

        fs::create_dir(&path).map_err(|source| RunError::WorkingDir {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "Created working directory");

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recursively delete the directory. Safe to call more than once.
    pub fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        match fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed working directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove working directory"
            ),
        }
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        self.remove();
    }
}
