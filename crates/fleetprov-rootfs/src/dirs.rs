//! Directory operations used by the rootfs filesystem source
//!
//! Kept behind a trait so allocation can be exercised against simulated
//! filesystem failures.

use async_trait::async_trait;
use std::io;
use std::path::Path;

/// What a path points at, without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
    Other,
}

#[async_trait]
pub trait DirectoryOperations: Send + Sync {
    /// Create `path` and any missing parents with permission `mode`.
    async fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Inspect `path` without following symlinks; `None` if it does not exist.
    async fn lstat(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Number of entries in the directory at `path`.
    async fn entry_count(&self, path: &Path) -> io::Result<usize>;

    /// Remove the empty directory at `path`.
    async fn remove_dir(&self, path: &Path) -> io::Result<()>;
}

/// [`DirectoryOperations`] on the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsDirectoryOperations;

#[async_trait]
impl DirectoryOperations for OsDirectoryOperations {
    async fn create_dir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = tokio::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(path).await
    }

    async fn lstat(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let file_type = metadata.file_type();
        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        };
        Ok(Some(kind))
    }

    async fn entry_count(&self, path: &Path) -> io::Result<usize> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut count = 0;
        while entries.next_entry().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    async fn remove_dir(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir(path).await
    }
}
