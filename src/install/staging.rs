//! Scoped staging directory for downloaded archives
//!
//! The staging root is created on acquire and removed either by `close` on
//! the success path or on drop when an attempt bails out early, so it never
//! outlives an install attempt.

use std::path::{Path, PathBuf};

use log::{debug, warn};

/// RAII guard over `server/install`
#[derive(Debug)]
pub struct StagingDir {
    root: PathBuf,
    closed: bool,
}

impl StagingDir {
    /// Create (if absent) the staging root and the version subdirectory.
    pub async fn acquire(root: PathBuf, version_dir: &Path) -> std::io::Result<Self> {
        // Guard first, so a failed mkdir still cleans up whatever was created
        let guard = Self {
            root,
            closed: false,
        };
        tokio::fs::create_dir_all(guard.root.join(version_dir)).await?;
        debug!("Staging directory ready at {}", guard.root.display());
        Ok(guard)
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Remove the staging root without blocking the runtime.
    ///
    /// On error the guard stays armed and drop retries the removal.
    pub async fn close(mut self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!("Removed staging directory {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.closed = true;
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Sync removal: drop cannot await. Only hit on early-exit paths.
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => debug!("Removed staging directory {}", self.root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Cannot remove {}: {}", self.root.display(), e),
        }
    }
}
