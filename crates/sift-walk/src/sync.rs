//! Blocking filesystem walker.
//!
//! Mirrors [`crate::Walker`] step for step — one recursion, blocking
//! I/O, no coalescing table since nothing runs concurrently. For a
//! static tree the result set is identical to the async walker's.

use std::path::PathBuf;
use std::sync::Arc;

use sift_match::Segment;

use crate::WalkError;
use crate::common::{
    IoErrorClass, Prepared, SetRef, classify_io_error, join_literals, join_prefix,
    literal_prefix_len, make_abs, prepare,
};
use crate::fs::{FileKind, SyncVfs};
use crate::ignore::IgnoreSet;
use crate::options::WalkOptions;
use crate::results::{MatchSet, finish};
use crate::state::{FsCache, PathState};

/// Synchronous glob walker over any [`SyncVfs`].
pub struct SyncWalker<F: SyncVfs> {
    fs: F,
    opts: WalkOptions,
    cwd: PathBuf,
    sets: Vec<SetRef>,
    ignore: IgnoreSet,
    cache: Arc<FsCache>,
    matches: Vec<MatchSet>,
}

impl<F: SyncVfs> SyncWalker<F> {
    pub fn new<S: AsRef<str>>(
        fs: F,
        patterns: &[S],
        options: WalkOptions,
    ) -> Result<Self, WalkError> {
        let Prepared {
            opts,
            cwd,
            sets,
            ignore,
            cache,
        } = prepare(patterns, options)?;
        let matches = (0..sets.len()).map(|_| MatchSet::default()).collect();
        Ok(Self {
            fs,
            opts,
            cwd,
            sets,
            ignore,
            cache,
            matches,
        })
    }

    /// Walk to completion and return the aggregated result list.
    pub fn collect(mut self) -> Result<Vec<String>, WalkError> {
        if let Err(e) = self.fs.lstat(&self.cwd) {
            return Err(WalkError::InvalidCwd(format!(
                "{}: {e}",
                self.cwd.display()
            )));
        }
        for i in 0..self.sets.len() {
            let segments = self.sets[i].segments.clone();
            self.process(segments, i, false)?;
        }

        if self.opts.realpath {
            for set in &mut self.matches {
                for m in set.take() {
                    let abs = make_abs(&self.cwd, &m);
                    let resolved = match self.fs.canonicalize(&abs) {
                        Ok(real) => real,
                        Err(_) => abs,
                    };
                    set.insert(resolved.to_string_lossy().into_owned());
                }
            }
        }

        Ok(finish(
            &self.sets,
            self.matches,
            &self.cache,
            &self.ignore,
            &self.opts,
            &self.cwd,
        ))
    }

    fn process(
        &mut self,
        pattern: Vec<Segment>,
        index: usize,
        in_globstar: bool,
    ) -> Result<(), WalkError> {
        let n = literal_prefix_len(&pattern);
        if n == pattern.len() {
            let joined = join_literals(&pattern, n);
            return self.process_simple(joined, index);
        }

        let mut prefix = if n == 0 {
            None
        } else {
            Some(join_literals(&pattern, n))
        };
        let pattern_abs = matches!(pattern.first(), Some(Segment::Literal(l)) if l.is_empty());
        let read = match &mut prefix {
            None => ".".to_string(),
            Some(p) => {
                if p.starts_with('/') || pattern_abs {
                    if !p.starts_with('/') {
                        *p = format!("/{p}");
                    }
                    p.clone()
                } else {
                    p.clone()
                }
            }
        };
        let abs = make_abs(&self.cwd, &read);

        if self.ignore.children_ignored(&read) {
            return Ok(());
        }

        let remain = pattern[n..].to_vec();
        if matches!(remain[0], Segment::GlobStar) {
            self.process_globstar(prefix.as_deref(), abs, &remain, index, in_globstar)
        } else {
            self.process_readdir(prefix.as_deref(), abs, &remain, index, in_globstar)
        }
    }

    fn process_readdir(
        &mut self,
        prefix: Option<&str>,
        abs: PathBuf,
        remain: &[Segment],
        index: usize,
        in_globstar: bool,
    ) -> Result<(), WalkError> {
        let Some(entries) = self.readdir(abs, in_globstar)? else {
            return Ok(());
        };
        let Segment::Matcher(pn) = &remain[0] else {
            return Ok(());
        };

        let dot_ok = self.opts.dot || pn.source().starts_with('.');
        let matched: Vec<String> = entries
            .iter()
            .filter(|e| (dot_ok || !e.starts_with('.')) && pn.is_match(e))
            .cloned()
            .collect();
        if matched.is_empty() {
            return Ok(());
        }

        if remain.len() == 1 && !self.opts.mark {
            for e in &matched {
                self.emit_match(index, join_prefix(prefix, e));
            }
            return Ok(());
        }

        let rest = &remain[1..];
        for e in &matched {
            let mut next = Vec::with_capacity(1 + rest.len());
            next.push(Segment::Literal(join_prefix(prefix, e)));
            next.extend_from_slice(rest);
            self.process(next, index, in_globstar)?;
        }
        Ok(())
    }

    fn process_globstar(
        &mut self,
        prefix: Option<&str>,
        abs: PathBuf,
        remain: &[Segment],
        index: usize,
        in_globstar: bool,
    ) -> Result<(), WalkError> {
        let Some(entries) = self.readdir(abs.clone(), in_globstar)? else {
            return Ok(());
        };

        let remain_without = &remain[1..];

        let mut no_globstar = Vec::with_capacity(1 + remain_without.len());
        if let Some(p) = prefix {
            no_globstar.push(Segment::Literal(p.to_string()));
        }
        no_globstar.extend_from_slice(remain_without);
        self.process(no_globstar, index, false)?;

        let is_symlink = self.cache.symlink(&abs) == Some(true);
        if is_symlink && in_globstar {
            return Ok(());
        }

        for entry in entries.iter() {
            if entry.starts_with('.') && !self.opts.dot {
                continue;
            }

            let mut instead = Vec::with_capacity(2 + remain_without.len());
            if let Some(p) = prefix {
                instead.push(Segment::Literal(p.to_string()));
            }
            instead.push(Segment::Literal(entry.clone()));
            instead.extend_from_slice(remain_without);
            self.process(instead, index, true)?;

            let mut below = Vec::with_capacity(2 + remain.len());
            if let Some(p) = prefix {
                below.push(Segment::Literal(p.to_string()));
            }
            below.push(Segment::Literal(entry.clone()));
            below.extend_from_slice(remain);
            self.process(below, index, true)?;
        }
        Ok(())
    }

    fn process_simple(&mut self, literal: String, index: usize) -> Result<(), WalkError> {
        if self.stat_path(&literal).is_none() {
            return Ok(());
        }
        self.emit_match(index, literal);
        Ok(())
    }

    fn emit_match(&mut self, index: usize, m: String) {
        if self.ignore.is_ignored(&m) {
            return;
        }
        let abs = make_abs(&self.cwd, &m);
        let mut m = m;
        if self.opts.mark {
            m = crate::results::mark(&self.cache, &self.cwd, &m);
        }
        if self.opts.absolute {
            m = abs.to_string_lossy().into_owned();
        }
        if self.opts.nodir
            && let Some(state) = self.cache.path_state(&abs)
            && state.is_dir()
        {
            return;
        }
        self.matches[index].insert(m);
    }

    fn readdir(&mut self, abs: PathBuf, in_globstar: bool) -> Result<Option<Arc<Vec<String>>>, WalkError> {
        if in_globstar && self.cache.symlink(&abs).is_none() {
            return self.readdir_in_globstar(abs);
        }
        if let Some(state) = self.cache.path_state(&abs) {
            match state {
                PathState::Missing | PathState::File => return Ok(None),
                PathState::Listing(listing) => return Ok(Some(listing)),
                PathState::Exists | PathState::Dir => {}
            }
        }
        match self.fs.read_dir(&abs) {
            Ok(entries) => {
                let listing = Arc::new(entries);
                if !self.opts.mark {
                    for e in listing.iter() {
                        self.cache
                            .set_path_state_if_absent(abs.join(e), PathState::Exists);
                    }
                }
                self.cache
                    .set_path_state(abs, PathState::Listing(listing.clone()));
                Ok(Some(listing))
            }
            Err(err) => self.readdir_error(abs, err).map(|()| None),
        }
    }

    fn readdir_error(&mut self, abs: PathBuf, err: std::io::Error) -> Result<(), WalkError> {
        match classify_io_error(&err) {
            IoErrorClass::NotDir => {
                let is_cwd = abs == self.cwd;
                self.cache.set_path_state(abs.clone(), PathState::File);
                if is_cwd {
                    return Err(WalkError::InvalidCwd(format!(
                        "{}: {err}",
                        abs.display()
                    )));
                }
                Ok(())
            }
            IoErrorClass::Missing => {
                self.cache.set_path_state(abs, PathState::Missing);
                Ok(())
            }
            IoErrorClass::Other => {
                self.cache.set_path_state(abs.clone(), PathState::Missing);
                if self.opts.strict {
                    return Err(WalkError::Access {
                        path: abs,
                        message: err.to_string(),
                    });
                }
                if !self.opts.silent {
                    tracing::warn!(
                        path = %abs.display(),
                        error = %err,
                        "skipping unreadable directory"
                    );
                }
                Ok(())
            }
        }
    }

    fn readdir_in_globstar(&mut self, abs: PathBuf) -> Result<Option<Arc<Vec<String>>>, WalkError> {
        if self.opts.follow {
            return self.readdir(abs, false);
        }
        match self.fs.lstat(&abs) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(_) => {
                self.cache.set_symlink(abs.clone(), false);
                self.readdir(abs, false)
            }
            Ok(kind) => {
                let is_symlink = kind == FileKind::Symlink;
                self.cache.set_symlink(abs.clone(), is_symlink);
                if !is_symlink && kind != FileKind::Dir {
                    self.cache.set_path_state(abs, PathState::File);
                    Ok(None)
                } else {
                    self.readdir(abs, false)
                }
            }
        }
    }

    fn stat_path(&mut self, f: &str) -> Option<PathState> {
        if f.is_empty() {
            return None;
        }
        let abs = make_abs(&self.cwd, f);
        let need_dir = f.ends_with('/');

        if let Some(state) = self.cache.path_state(&abs) {
            let state = match state {
                PathState::Listing(_) => PathState::Dir,
                other => other,
            };
            if !need_dir || state.is_dir() {
                return state.exists().then_some(state);
            }
            if matches!(state, PathState::File) {
                return None;
            }
        }

        if let Some(cached) = self.cache.stat_result(&abs) {
            return match cached {
                None => None,
                Some(kind) => {
                    let state = if kind == FileKind::Dir {
                        PathState::Dir
                    } else {
                        PathState::File
                    };
                    (!need_dir || state.is_dir()).then_some(state)
                }
            };
        }

        let kind = match self.fs.lstat(&abs) {
            Ok(FileKind::Symlink) => match self.fs.stat(&abs) {
                Ok(kind) => Some(kind),
                Err(_) => Some(FileKind::File),
            },
            Ok(kind) => Some(kind),
            Err(err) => {
                if classify_io_error(&err) == IoErrorClass::Other && !self.opts.silent {
                    tracing::warn!(
                        path = %abs.display(),
                        error = %err,
                        "stat failed"
                    );
                }
                None
            }
        };
        self.cache.set_stat_result(abs.clone(), kind);
        match kind {
            None => None,
            Some(kind) => {
                let state = if kind == FileKind::Dir {
                    PathState::Dir
                } else {
                    PathState::File
                };
                self.cache.set_path_state_if_absent(abs, state.clone());
                (!need_dir || state.is_dir()).then_some(state)
            }
        }
    }
}
