//! Crash-safe file replacement.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Suffix of in-progress writes. Files carrying it are never valid entries.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Returns a unique hidden sibling path for staging a write to `path`.
#[must_use]
pub fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}{PARTIAL_SUFFIX}", uuid::Uuid::new_v4()))
}

/// A fully written sibling file waiting to be renamed over its target.
///
/// Dropping it without [`StagedFile::commit`] removes the staged copy.
#[derive(Debug)]
pub struct StagedFile {
    staged: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Writes and syncs `bytes` next to `target` without touching `target`.
    ///
    /// # Errors
    /// Returns error if the staged file cannot be created or written.
    pub async fn write(target: &Path, bytes: &[u8]) -> std::io::Result<Self> {
        let staged = Self {
            staged: staging_path(target),
            target: target.to_path_buf(),
            committed: false,
        };

        let mut file = fs::File::create(&staged.staged).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;

        Ok(staged)
    }

    /// Location of the staged copy.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.staged
    }

    /// Renames the staged copy over the target. Metadata such as the
    /// modification time carries over unchanged.
    ///
    /// # Errors
    /// Returns error if the rename fails; the staged copy is then removed.
    pub async fn commit(mut self) -> std::io::Result<()> {
        fs::rename(&self.staged, &self.target).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.staged)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.staged.display(), error = %e, "Failed to remove partial file");
        }
    }
}

/// Writes `bytes` to `path` so that readers observe either the old content or
/// the complete new content.
///
/// # Errors
/// Returns error if the staged file cannot be written or renamed.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    StagedFile::write(path, bytes).await?.commit().await
}

/// Removes `path`, treating a missing file as success.
///
/// # Errors
/// Returns error for any failure other than the file not existing.
pub async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Deletes leftover staged files in `dir` from interrupted writes.
pub async fn sweep_partials(dir: &Path) -> usize {
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return 0;
    };

    let mut removed = 0;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX) {
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Failed to remove partial file"),
            }
        }
    }
    removed
}
