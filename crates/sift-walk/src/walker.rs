//! Async filesystem walker.
//!
//! Traversal works per pattern set. Each step consumes the longest
//! literal prefix of the remaining segments, lists that directory, and
//! either filters the entries through the next segment matcher or fans
//! out for globstar. Pattern sets are walked concurrently and share one
//! cache, so identical directory reads collapse into a single syscall.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, try_join_all};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use sift_match::Segment;

use crate::common::{
    IoErrorClass, Prepared, SetRef, classify_io_error, join_literals, join_prefix,
    literal_prefix_len, make_abs, prepare,
};
use crate::fs::{FileKind, Vfs};
use crate::ignore::IgnoreSet;
use crate::options::WalkOptions;
use crate::results::{MatchSet, finish};
use crate::state::{FsCache, Inflight, PathState};
use crate::{WalkError, WalkEvent};

type ReadDirOutcome = Result<Option<Arc<Vec<String>>>, WalkError>;

#[derive(Debug, Clone, Copy)]
enum LstatOutcome {
    /// Nothing there; the globstar branch dies quietly.
    Missing,
    /// A plain file; cached, no listing to do.
    NotDir,
    /// A directory or symlink; proceed to the real listing.
    Descend,
}

/// Asynchronous glob walker over any [`Vfs`].
pub struct Walker<F: Vfs> {
    fs: Arc<F>,
    opts: WalkOptions,
    cwd: PathBuf,
    sets: Vec<SetRef>,
    ignore: IgnoreSet,
    cache: Arc<FsCache>,
    readdir_inflight: Inflight<(PathBuf, bool), ReadDirOutcome>,
    lstat_inflight: Inflight<PathBuf, LstatOutcome>,
    stat_inflight: Inflight<PathBuf, Option<FileKind>>,
    matches: Mutex<Vec<MatchSet>>,
    token: CancellationToken,
    sender: Option<mpsc::Sender<WalkEvent>>,
}

impl<F: Vfs> Walker<F> {
    pub fn new<S: AsRef<str>>(
        fs: Arc<F>,
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
            readdir_inflight: Inflight::new(),
            lstat_inflight: Inflight::new(),
            stat_inflight: Inflight::new(),
            matches: Mutex::new(matches),
            token: CancellationToken::new(),
            sender: None,
        })
    }

    /// Token for cancelling the walk. Once cancelled, pending work
    /// becomes a no-op; results of already-issued operations are
    /// discarded on arrival.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Walk to completion and return the aggregated result list.
    pub async fn collect(self) -> Result<Vec<String>, WalkError> {
        self.run_all().await?;
        Ok(self.finalize().await)
    }

    /// Walk, delivering matches through `events` as they are found. A
    /// fatal error is delivered on the same channel and ends the walk;
    /// the channel closing is the end-of-walk signal. A slow consumer
    /// exerts backpressure: traversal stalls while the channel is full.
    pub async fn run(mut self, events: mpsc::Sender<WalkEvent>) {
        self.sender = Some(events.clone());
        if let Err(err) = self.run_all().await {
            if !matches!(err, WalkError::Aborted) {
                let _ = events.send(WalkEvent::Error(err)).await;
            }
        }
    }

    async fn run_all(&self) -> Result<(), WalkError> {
        // a walk rooted in an unreadable directory cannot produce
        // meaningful results no matter how lenient the options are
        if let Err(e) = self.fs.lstat(&self.cwd).await {
            return Err(WalkError::InvalidCwd(format!(
                "{}: {e}",
                self.cwd.display()
            )));
        }
        let work = self
            .sets
            .iter()
            .enumerate()
            .map(|(i, set)| self.process(set.segments.clone(), i, false));
        try_join_all(work).await?;
        if self.token.is_cancelled() {
            return Err(WalkError::Aborted);
        }
        Ok(())
    }

    async fn finalize(self) -> Vec<String> {
        let mut matches = self
            .matches
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.opts.realpath {
            for set in &mut matches {
                for m in set.take() {
                    let abs = make_abs(&self.cwd, &m);
                    let resolved = match self.fs.canonicalize(&abs).await {
                        Ok(real) => real,
                        // a result that cannot be resolved keeps its
                        // absolute, unresolved form
                        Err(_) => abs,
                    };
                    set.insert(resolved.to_string_lossy().into_owned());
                }
            }
        }

        finish(
            &self.sets,
            matches,
            &self.cache,
            &self.ignore,
            &self.opts,
            &self.cwd,
        )
    }

    fn process<'a>(
        &'a self,
        pattern: Vec<Segment>,
        index: usize,
        in_globstar: bool,
    ) -> BoxFuture<'a, Result<(), WalkError>> {
        async move {
            if self.token.is_cancelled() {
                return Ok(());
            }

            let n = literal_prefix_len(&pattern);
            if n == pattern.len() {
                // nothing left to match against: stat the literal path
                let joined = join_literals(&pattern, n);
                return self.process_simple(joined, index).await;
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

            // a subtree wholly excluded by an ignore pattern is pruned
            // before any listing happens
            if self.ignore.children_ignored(&read) {
                return Ok(());
            }

            let remain = &pattern[n..];
            if matches!(remain[0], Segment::GlobStar) {
                self.process_globstar(prefix.as_deref(), abs, remain, index, in_globstar)
                    .await
            } else {
                self.process_readdir(prefix.as_deref(), abs, remain, index, in_globstar)
                    .await
            }
        }
        .boxed()
    }

    async fn process_readdir(
        &self,
        prefix: Option<&str>,
        abs: PathBuf,
        remain: &[Segment],
        index: usize,
        in_globstar: bool,
    ) -> Result<(), WalkError> {
        let Some(entries) = self.readdir(abs, in_globstar).await? else {
            return Ok(());
        };
        let Segment::Matcher(pn) = &remain[0] else {
            return Ok(());
        };

        // entries only match a leading dot if the pattern spells one out
        let dot_ok = self.opts.dot || pn.source().starts_with('.');
        let matched: Vec<&String> = entries
            .iter()
            .filter(|e| (dot_ok || !e.starts_with('.')) && pn.is_match(e))
            .collect();
        if matched.is_empty() {
            return Ok(());
        }

        if remain.len() == 1 && !self.opts.mark {
            // the listing already proves these exist; no stat needed
            for e in matched {
                self.emit_match(index, join_prefix(prefix, e)).await;
            }
            return Ok(());
        }

        let rest = &remain[1..];
        for e in matched {
            let mut next = Vec::with_capacity(1 + rest.len());
            next.push(Segment::Literal(join_prefix(prefix, e)));
            next.extend_from_slice(rest);
            self.process(next, index, in_globstar).await?;
        }
        Ok(())
    }

    async fn process_globstar(
        &self,
        prefix: Option<&str>,
        abs: PathBuf,
        remain: &[Segment],
        index: usize,
        in_globstar: bool,
    ) -> Result<(), WalkError> {
        // not a directory: foo.txt/** can never match
        let Some(entries) = self.readdir(abs.clone(), in_globstar).await? else {
            return Ok(());
        };

        let remain_without = &remain[1..];

        // the zero-segment case: drop the globstar and match the rest
        // right here
        let mut no_globstar = Vec::with_capacity(1 + remain_without.len());
        if let Some(p) = prefix {
            no_globstar.push(Segment::Literal(p.to_string()));
        }
        no_globstar.extend_from_slice(remain_without);
        self.process(no_globstar, index, false).await?;

        // a symlinked directory reached through a globstar stops the
        // descent at one level, which bounds cyclic link chains
        let is_symlink = self.cache.symlink(&abs) == Some(true);
        if is_symlink && in_globstar {
            return Ok(());
        }

        for entry in entries.iter() {
            if entry.starts_with('.') && !self.opts.dot {
                continue;
            }

            // each child both replaces the globstar and sits below it,
            // realizing the zero-or-more semantics
            let mut instead = Vec::with_capacity(2 + remain_without.len());
            if let Some(p) = prefix {
                instead.push(Segment::Literal(p.to_string()));
            }
            instead.push(Segment::Literal(entry.clone()));
            instead.extend_from_slice(remain_without);
            self.process(instead, index, true).await?;

            let mut below = Vec::with_capacity(2 + remain.len());
            if let Some(p) = prefix {
                below.push(Segment::Literal(p.to_string()));
            }
            below.push(Segment::Literal(entry.clone()));
            below.extend_from_slice(remain);
            self.process(below, index, true).await?;
        }
        Ok(())
    }

    async fn process_simple(&self, literal: String, index: usize) -> Result<(), WalkError> {
        if self.stat_path(&literal).await.is_none() {
            return Ok(());
        }
        self.emit_match(index, literal).await;
        Ok(())
    }

    async fn emit_match(&self, index: usize, m: String) {
        if self.token.is_cancelled() {
            return;
        }
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
        {
            let mut matches = self
                .matches
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !matches[index].insert(m.clone()) {
                return;
            }
        }
        if let Some(tx) = &self.sender {
            let _ = tx.send(WalkEvent::Match(m)).await;
        }
    }

    /// Cached, coalesced directory listing. `None` means "no listing
    /// here" — missing path, plain file, or symlink stopped in a
    /// globstar.
    fn readdir<'a>(
        &'a self,
        abs: PathBuf,
        in_globstar: bool,
    ) -> BoxFuture<'a, ReadDirOutcome> {
        async move {
            if self.token.is_cancelled() {
                return Ok(None);
            }
            // inside a globstar an unclassified path needs an lstat
            // first, so symlinked directories stop at one level
            if in_globstar && self.cache.symlink(&abs).is_none() {
                return self.readdir_in_globstar(abs).await;
            }
            if let Some(state) = self.cache.path_state(&abs) {
                match state {
                    PathState::Missing | PathState::File => return Ok(None),
                    PathState::Listing(listing) => return Ok(Some(listing)),
                    PathState::Exists | PathState::Dir => {}
                }
            }
            self.readdir_inflight
                .get_or_run((abs.clone(), in_globstar), || self.do_read_dir(abs))
                .await
        }
        .boxed()
    }

    async fn do_read_dir(&self, abs: PathBuf) -> ReadDirOutcome {
        match self.fs.read_dir(&abs).await {
            Ok(entries) => {
                let listing = Arc::new(entries);
                if !self.opts.mark {
                    // everything the listing names exists; remember that
                    // so the last pattern segment needs no extra stat
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

    fn readdir_error(&self, abs: PathBuf, err: std::io::Error) -> Result<(), WalkError> {
        match classify_io_error(&err) {
            IoErrorClass::NotDir => {
                // it exists, it's just a file
                let is_cwd = abs == self.cwd;
                self.cache.set_path_state(abs.clone(), PathState::File);
                if is_cwd {
                    self.token.cancel();
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
                    self.token.cancel();
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

    async fn readdir_in_globstar(&self, abs: PathBuf) -> ReadDirOutcome {
        if self.token.is_cancelled() {
            return Ok(None);
        }
        // following symlinks means a globstar treats them like any
        // other directory
        if self.opts.follow {
            return self.readdir(abs, false).await;
        }
        let outcome = self
            .lstat_inflight
            .get_or_run(abs.clone(), || self.do_lstat(abs.clone()))
            .await;
        match outcome {
            LstatOutcome::Missing | LstatOutcome::NotDir => Ok(None),
            LstatOutcome::Descend => self.readdir(abs, false).await,
        }
    }

    async fn do_lstat(&self, abs: PathBuf) -> LstatOutcome {
        match self.fs.lstat(&abs).await {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => LstatOutcome::Missing,
            Err(_) => {
                // let the listing surface the real error
                self.cache.set_symlink(abs, false);
                LstatOutcome::Descend
            }
            Ok(kind) => {
                let is_symlink = kind == FileKind::Symlink;
                self.cache.set_symlink(abs.clone(), is_symlink);
                if !is_symlink && kind != FileKind::Dir {
                    self.cache.set_path_state(abs, PathState::File);
                    LstatOutcome::NotDir
                } else {
                    LstatOutcome::Descend
                }
            }
        }
    }

    /// Classify a literal path, consulting and feeding the caches.
    /// `None` means it cannot satisfy the pattern (missing, or a file
    /// where a trailing slash demands a directory).
    async fn stat_path(&self, f: &str) -> Option<PathState> {
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
            // known to exist but kind unknown and a directory is
            // required: fall through to the stat
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

        let kind = self
            .stat_inflight
            .get_or_run(abs.clone(), || self.do_stat(abs.clone()))
            .await;
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

    async fn do_stat(&self, abs: PathBuf) -> Option<FileKind> {
        let kind = match self.fs.lstat(&abs).await {
            Ok(FileKind::Symlink) => match self.fs.stat(&abs).await {
                Ok(kind) => Some(kind),
                // a dangling symlink is treated as a plain file
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
        self.cache.set_stat_result(abs, kind);
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfs::MemFs;

    fn tree() -> MemFs {
        let mut fs = MemFs::new();
        fs.file("/src/index.ts");
        fs.file("/src/util.test.ts");
        fs.file("/README.md");
        fs
    }

    fn opts() -> WalkOptions {
        WalkOptions {
            cwd: Some(PathBuf::from("/")),
            ..WalkOptions::default()
        }
    }

    async fn run(
        fs: MemFs,
        patterns: &[&str],
        options: WalkOptions,
    ) -> Result<Vec<String>, WalkError> {
        Walker::new(Arc::new(fs), patterns, options)?.collect().await
    }

    #[tokio::test]
    async fn star_in_directory() {
        let got = run(
            tree(),
            &["src/*.ts"],
            WalkOptions {
                nodir: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, ["src/index.ts", "src/util.test.ts"]);
    }

    #[tokio::test]
    async fn globstar_finds_nested_files() {
        let got = run(tree(), &["**/*.test.ts"], opts()).await.unwrap();
        assert_eq!(got, ["src/util.test.ts"]);
    }

    #[tokio::test]
    async fn globstar_zero_segments() {
        let mut fs = MemFs::new();
        fs.file("/a/b");
        let got = run(fs, &["a/**/b"], opts()).await.unwrap();
        assert_eq!(got, ["a/b"]);
    }

    #[tokio::test]
    async fn dotfiles_hidden_unless_asked() {
        let mut fs = MemFs::new();
        fs.file("/.git/config");
        fs.file("/src/main.rs");
        let got = run(fs, &["**"], opts()).await.unwrap();
        assert_eq!(got, ["src", "src/main.rs"]);

        let mut fs = MemFs::new();
        fs.file("/.git/config");
        fs.file("/src/main.rs");
        let got = run(
            fs,
            &["**"],
            WalkOptions {
                dot: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, [".git", ".git/config", "src", "src/main.rs"]);
    }

    #[tokio::test]
    async fn nonull_returns_pattern_text() {
        let got = run(
            tree(),
            &["nope/*.x"],
            WalkOptions {
                nonull: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, ["nope/*.x"]);
    }

    #[tokio::test]
    async fn mark_suffixes_directories() {
        let got = run(
            tree(),
            &["*"],
            WalkOptions {
                mark: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, ["README.md", "src/"]);
    }

    #[tokio::test]
    async fn nodir_drops_directories() {
        let got = run(
            tree(),
            &["*"],
            WalkOptions {
                nodir: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, ["README.md"]);
    }

    #[tokio::test]
    async fn absolute_results() {
        let got = run(
            tree(),
            &["*.md"],
            WalkOptions {
                absolute: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, ["/README.md"]);
    }

    #[tokio::test]
    async fn multiple_patterns_merge_and_dedupe() {
        let got = run(tree(), &["*.md", "src/*.ts", "README.md"], opts())
            .await
            .unwrap();
        assert_eq!(got, ["README.md", "src/index.ts", "src/util.test.ts"]);
    }

    #[tokio::test]
    async fn trailing_slash_requires_directory() {
        let got = run(tree(), &["src/"], opts()).await.unwrap();
        assert_eq!(got, ["src/"]);
        let got = run(tree(), &["README.md/"], opts()).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn match_base_walks_everywhere() {
        let got = run(
            tree(),
            &["*.ts"],
            WalkOptions {
                match_base: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, ["src/index.ts", "src/util.test.ts"]);
    }

    #[tokio::test]
    async fn match_base_needs_globstar() {
        let err = run(
            tree(),
            &["*.ts"],
            WalkOptions {
                match_base: true,
                noglobstar: true,
                ..opts()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalkError::InvalidOptions(_)));
    }

    #[tokio::test]
    async fn ignored_subtree_is_never_listed() {
        let mut fs = MemFs::new();
        fs.file("/a/f.txt");
        fs.file("/a/b/g.txt");
        fs.dir("/a/b/c");
        let fs = Arc::new(fs);

        let walker = Walker::new(
            fs.clone(),
            &["a/**"],
            WalkOptions {
                ignore: vec!["a/b/**".to_string()],
                ..opts()
            },
        )
        .unwrap();
        let got = walker.collect().await.unwrap();

        assert_eq!(got, ["a", "a/f.txt"]);
        let listed = fs.readdir_calls();
        assert!(
            !listed.iter().any(|p| p.starts_with("/a/b")),
            "pruned subtree was listed: {listed:?}"
        );
    }

    #[tokio::test]
    async fn strict_errors_are_fatal() {
        let mut fs = MemFs::new();
        fs.file("/ok/x.txt");
        fs.dir("/forbidden");
        fs.file("/forbidden/secret.txt");
        fs.deny("/forbidden");

        let err = run(fs, &["**"], opts()).await.unwrap_err();
        assert!(matches!(err, WalkError::Access { .. }));
    }

    #[tokio::test]
    async fn lenient_walks_skip_unreadable_branches() {
        let mut fs = MemFs::new();
        fs.file("/ok/x.txt");
        fs.dir("/forbidden");
        fs.file("/forbidden/secret.txt");
        fs.deny("/forbidden");

        let got = run(
            fs,
            &["**"],
            WalkOptions {
                strict: false,
                silent: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert!(got.iter().any(|p| p == "ok/x.txt"));
        assert!(!got.iter().any(|p| p.contains("secret")));
    }

    #[tokio::test]
    async fn unreadable_cwd_is_always_fatal() {
        let err = run(
            tree(),
            &["*"],
            WalkOptions {
                cwd: Some(PathBuf::from("/nope")),
                ..WalkOptions::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalkError::InvalidCwd(_)));

        let err = run(
            tree(),
            &["*"],
            WalkOptions {
                cwd: Some(PathBuf::from("/README.md")),
                ..WalkOptions::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WalkError::InvalidCwd(_)));
    }

    #[tokio::test]
    async fn symlinked_directory_stops_globstar() {
        let mut fs = MemFs::new();
        fs.file("/real/data.txt");
        fs.symlink_dir("/link", "/real");

        let got = run(fs, &["**"], opts()).await.unwrap();
        assert_eq!(got, ["link", "real", "real/data.txt"]);
    }

    #[tokio::test]
    async fn follow_descends_through_symlinks() {
        let mut fs = MemFs::new();
        fs.file("/real/data.txt");
        fs.symlink_dir("/link", "/real");

        let got = run(
            fs,
            &["**"],
            WalkOptions {
                follow: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert!(got.iter().any(|p| p == "link/data.txt"));
        assert!(got.iter().any(|p| p == "real/data.txt"));
    }

    #[tokio::test]
    async fn symlink_cycle_terminates() {
        let mut fs = MemFs::new();
        fs.file("/a/fa.txt");
        fs.file("/b/fb.txt");
        fs.symlink_dir("/a/link_to_b", "/b");
        fs.symlink_dir("/b/link_to_a", "/a");

        let got = run(fs, &["**"], opts()).await.unwrap();
        assert!(got.iter().any(|p| p == "a/fa.txt"));
        assert!(got.iter().any(|p| p == "b/fb.txt"));
        assert!(got.iter().any(|p| p == "a/link_to_b"));
        // one level only: the cycle is never entered
        assert!(!got.iter().any(|p| p.contains("link_to_b/")));
        assert!(!got.iter().any(|p| p.contains("link_to_a/")));
    }

    #[tokio::test]
    async fn realpath_resolves_results() {
        let mut fs = MemFs::new();
        fs.file("/real/data.txt");
        fs.symlink_dir("/link", "/real");

        let got = run(
            fs,
            &["link/*"],
            WalkOptions {
                realpath: true,
                ..opts()
            },
        )
        .await
        .unwrap();
        assert_eq!(got, ["/real/data.txt"]);
    }

    #[tokio::test]
    async fn injected_cache_skips_repeat_listings() {
        let cache = Arc::new(FsCache::new());

        let fs1 = Arc::new(tree());
        let first = Walker::new(
            fs1.clone(),
            &["*"],
            WalkOptions {
                cache: Some(cache.clone()),
                ..opts()
            },
        )
        .unwrap();
        let a = first.collect().await.unwrap();

        let fs2 = Arc::new(tree());
        let second = Walker::new(
            fs2.clone(),
            &["*"],
            WalkOptions {
                cache: Some(cache),
                ..opts()
            },
        )
        .unwrap();
        let b = second.collect().await.unwrap();

        assert_eq!(a, b);
        assert!(
            fs2.readdir_calls().is_empty(),
            "second walk should be served from the injected cache"
        );
    }

    #[tokio::test]
    async fn streaming_delivers_matches_then_closes() {
        let walker = Walker::new(Arc::new(tree()), &["src/*.ts"], opts()).unwrap();
        let (tx, mut rx) = mpsc::channel(2);
        let handle = tokio::spawn(walker.run(tx));

        let mut matched = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                WalkEvent::Match(m) => matched.push(m),
                WalkEvent::Error(e) => panic!("unexpected error: {e}"),
            }
        }
        handle.await.unwrap();
        assert_eq!(matched, ["src/index.ts", "src/util.test.ts"]);
    }

    #[tokio::test]
    async fn cancelled_walk_reports_aborted() {
        let walker = Walker::new(Arc::new(tree()), &["**"], opts()).unwrap();
        walker.cancellation_token().cancel();
        let err = walker.collect().await.unwrap_err();
        assert!(matches!(err, WalkError::Aborted));
    }
}
