//! Minimal read-only filesystem abstraction for the walkers.
//!
//! The walkers are generic over these traits so consumers can adapt
//! their own filesystem layer, and so tests can drive them against an
//! in-memory tree or a call-counting stub.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// What a path resolves to, as reported by `lstat`/`stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

/// Async filesystem surface used by [`crate::Walker`].
///
/// `read_dir` returns entry names only — classification happens lazily
/// through `lstat`, and only where the traversal actually needs it.
#[async_trait]
pub trait Vfs: Send + Sync {
    /// List the entry names in a directory.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Classify a path without following a final symlink.
    async fn lstat(&self, path: &Path) -> io::Result<FileKind>;

    /// Classify a path, following symlinks.
    async fn stat(&self, path: &Path) -> io::Result<FileKind>;

    /// Resolve a path to its canonical form, following symlinks.
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Blocking filesystem surface used by [`crate::SyncWalker`].
pub trait SyncVfs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;
    fn lstat(&self, path: &Path) -> io::Result<FileKind>;
    fn stat(&self, path: &Path) -> io::Result<FileKind>;
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

impl<T: SyncVfs + ?Sized> SyncVfs for &T {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        (**self).read_dir(path)
    }

    fn lstat(&self, path: &Path) -> io::Result<FileKind> {
        (**self).lstat(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileKind> {
        (**self).stat(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }
}

fn kind_of(ft: std::fs::FileType) -> FileKind {
    if ft.is_symlink() {
        FileKind::Symlink
    } else if ft.is_dir() {
        FileKind::Dir
    } else {
        FileKind::File
    }
}

/// The real filesystem. Implements both traits: `std::fs` for the sync
/// walker, `tokio::fs` for the async one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl SyncVfs for RealFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    fn lstat(&self, path: &Path) -> io::Result<FileKind> {
        std::fs::symlink_metadata(path).map(|m| kind_of(m.file_type()))
    }

    fn stat(&self, path: &Path) -> io::Result<FileKind> {
        std::fs::metadata(path).map(|m| kind_of(m.file_type()))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

#[async_trait]
impl Vfs for RealFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut rd = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }

    async fn lstat(&self, path: &Path) -> io::Result<FileKind> {
        tokio::fs::symlink_metadata(path)
            .await
            .map(|m| kind_of(m.file_type()))
    }

    async fn stat(&self, path: &Path) -> io::Result<FileKind> {
        tokio::fs::metadata(path).await.map(|m| kind_of(m.file_type()))
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }
}
