//! Per-walk mutable state: the path classification cache, the stat and
//! symlink caches, and the in-flight request table that coalesces
//! identical syscalls issued by concurrently-walked pattern sets.

use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::fs::FileKind;

/// What the walk has learned about a path so far.
#[derive(Debug, Clone)]
pub enum PathState {
    /// Known to exist, kind not yet established.
    Exists,
    File,
    Dir,
    /// A directory whose listing has been read.
    Listing(std::sync::Arc<Vec<String>>),
    /// Known not to exist (or unreachable: too many links, name too long).
    Missing,
}

impl PathState {
    pub fn is_dir(&self) -> bool {
        matches!(self, PathState::Dir | PathState::Listing(_))
    }

    pub fn exists(&self) -> bool {
        !matches!(self, PathState::Missing)
    }
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Caches accumulated during a walk.
///
/// A fresh cache is created per walker invocation. Callers may instead
/// inject one through `WalkOptions::cache` to reuse lookups across
/// walks over an unchanged tree — the caller owns its lifetime and is
/// responsible for dropping it when the tree changes.
#[derive(Debug, Default)]
pub struct FsCache {
    paths: Mutex<HashMap<PathBuf, PathState>>,
    stats: Mutex<HashMap<PathBuf, Option<FileKind>>>,
    symlinks: Mutex<HashMap<PathBuf, bool>>,
}

impl FsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn path_state(&self, path: &Path) -> Option<PathState> {
        locked(&self.paths).get(path).cloned()
    }

    pub(crate) fn set_path_state(&self, path: PathBuf, state: PathState) {
        locked(&self.paths).insert(path, state);
    }

    /// Record a state only if nothing better is known already — a
    /// `Listing` must not be downgraded to a bare `Dir`.
    pub(crate) fn set_path_state_if_absent(&self, path: PathBuf, state: PathState) {
        locked(&self.paths).entry(path).or_insert(state);
    }

    pub(crate) fn stat_result(&self, path: &Path) -> Option<Option<FileKind>> {
        locked(&self.stats).get(path).copied()
    }

    pub(crate) fn set_stat_result(&self, path: PathBuf, kind: Option<FileKind>) {
        locked(&self.stats).insert(path, kind);
    }

    pub(crate) fn symlink(&self, path: &Path) -> Option<bool> {
        locked(&self.symlinks).get(path).copied()
    }

    pub(crate) fn set_symlink(&self, path: PathBuf, is_symlink: bool) {
        locked(&self.symlinks).insert(path, is_symlink);
    }

    /// Mirror one path's entries under another key (used when `mark`
    /// rewrites a result with a trailing slash).
    pub(crate) fn copy_entries(&self, from: &Path, to: &Path) {
        let state = locked(&self.paths).get(from).cloned();
        if let Some(s) = state {
            locked(&self.paths).insert(to.to_path_buf(), s);
        }
        let stat = locked(&self.stats).get(from).copied();
        if let Some(s) = stat {
            locked(&self.stats).insert(to.to_path_buf(), s);
        }
    }
}

/// In-flight request coalescing, scoped to one walker.
///
/// Concurrent requests for the same key run the underlying operation
/// once and fan the (cloned) result out to every waiter. Keys are typed
/// `(operation, path)` pairs — each walker holds one table per
/// operation, so a `read_dir` never collides with an `lstat` of the
/// same path.
pub(crate) struct Inflight<K, V> {
    map: Mutex<HashMap<K, std::sync::Arc<tokio::sync::OnceCell<V>>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Inflight<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn get_or_run<F, Fut>(&self, key: K, run: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut map = locked(&self.map);
            map.entry(key)
                .or_insert_with(|| std::sync::Arc::new(tokio::sync::OnceCell::new()))
                .clone()
        };
        cell.get_or_init(run).await.clone()
    }
}
