//! In-memory filesystem for exercising the walkers in tests.
//!
//! Supports files, directories and directory symlinks, records every
//! `read_dir` call so tests can assert which directories were actually
//! listed, and can deny access to specific paths to drive the error
//! paths.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::fs::{FileKind, SyncVfs, Vfs};

#[derive(Default)]
pub(crate) struct MemFs {
    files: HashSet<PathBuf>,
    dirs: HashSet<PathBuf>,
    symlinks: HashMap<PathBuf, PathBuf>,
    denied: HashSet<PathBuf>,
    pub(crate) readdir_log: Mutex<Vec<PathBuf>>,
}

impl MemFs {
    pub(crate) fn new() -> Self {
        let mut fs = Self::default();
        fs.dirs.insert(PathBuf::from("/"));
        fs
    }

    pub(crate) fn file(&mut self, path: &str) {
        let path = PathBuf::from(path);
        self.ensure_parents(&path);
        self.files.insert(path);
    }

    pub(crate) fn dir(&mut self, path: &str) {
        let path = PathBuf::from(path);
        self.ensure_parents(&path);
        self.dirs.insert(path);
    }

    /// A directory symlink: `link` points at `target`.
    pub(crate) fn symlink_dir(&mut self, link: &str, target: &str) {
        let link = PathBuf::from(link);
        self.ensure_parents(&link);
        self.symlinks.insert(link, PathBuf::from(target));
    }

    /// Listing this path fails with a permission error.
    pub(crate) fn deny(&mut self, path: &str) {
        self.denied.insert(PathBuf::from(path));
    }

    pub(crate) fn readdir_calls(&self) -> Vec<PathBuf> {
        self.readdir_log.lock().unwrap().clone()
    }

    fn ensure_parents(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            let mut cur = PathBuf::new();
            for comp in parent.components() {
                cur.push(comp);
                self.dirs.insert(cur.clone());
            }
        }
    }

    /// Resolve symlinks in every prefix, the way a real path walk does.
    fn resolve(&self, path: &Path) -> PathBuf {
        let mut resolved = PathBuf::new();
        for comp in path.components() {
            resolved.push(comp);
            if let Some(target) = self.symlinks.get(&resolved) {
                resolved = target.clone();
            }
        }
        resolved
    }

    /// Resolve symlinks in the parent only, keeping the final
    /// component as-is (lstat semantics).
    fn resolve_parent(&self, path: &Path) -> PathBuf {
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => self.resolve(parent).join(name),
            _ => path.to_path_buf(),
        }
    }

    fn read_dir_impl(&self, path: &Path) -> io::Result<Vec<String>> {
        self.readdir_log.lock().unwrap().push(path.to_path_buf());
        if self.denied.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            ));
        }
        let resolved = self.resolve(path);
        if self.files.contains(&resolved) {
            return Err(io::Error::new(io::ErrorKind::NotADirectory, "not a directory"));
        }
        if !self.dirs.contains(&resolved) {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no such directory"));
        }

        let mut names: HashSet<String> = HashSet::new();
        for p in self.files.iter().chain(self.dirs.iter()) {
            if p.parent() == Some(resolved.as_path()) && p != &resolved {
                if let Some(name) = p.file_name() {
                    names.insert(name.to_string_lossy().into_owned());
                }
            }
        }
        for p in self.symlinks.keys() {
            if p.parent() == Some(resolved.as_path()) {
                if let Some(name) = p.file_name() {
                    names.insert(name.to_string_lossy().into_owned());
                }
            }
        }
        let mut names: Vec<String> = names.into_iter().collect();
        names.sort();
        Ok(names)
    }

    fn lstat_impl(&self, path: &Path) -> io::Result<FileKind> {
        let p = self.resolve_parent(path);
        if self.symlinks.contains_key(&p) {
            return Ok(FileKind::Symlink);
        }
        if self.dirs.contains(&p) {
            return Ok(FileKind::Dir);
        }
        if self.files.contains(&p) {
            return Ok(FileKind::File);
        }
        Err(io::Error::new(io::ErrorKind::NotFound, "no such path"))
    }

    fn stat_impl(&self, path: &Path) -> io::Result<FileKind> {
        let p = self.resolve(path);
        if self.dirs.contains(&p) {
            return Ok(FileKind::Dir);
        }
        if self.files.contains(&p) {
            return Ok(FileKind::File);
        }
        Err(io::Error::new(io::ErrorKind::NotFound, "no such path"))
    }

    fn canonicalize_impl(&self, path: &Path) -> io::Result<PathBuf> {
        let p = self.resolve(path);
        if self.dirs.contains(&p) || self.files.contains(&p) {
            Ok(p)
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such path"))
        }
    }
}

impl SyncVfs for MemFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        self.read_dir_impl(path)
    }

    fn lstat(&self, path: &Path) -> io::Result<FileKind> {
        self.lstat_impl(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileKind> {
        self.stat_impl(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.canonicalize_impl(path)
    }
}

#[async_trait]
impl Vfs for MemFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        self.read_dir_impl(path)
    }

    async fn lstat(&self, path: &Path) -> io::Result<FileKind> {
        self.lstat_impl(path)
    }

    async fn stat(&self, path: &Path) -> io::Result<FileKind> {
        self.stat_impl(path)
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        self.canonicalize_impl(path)
    }
}
