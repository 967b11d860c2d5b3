//! sift-walk: filesystem walking for sift glob patterns.
//!
//! Provides:
//! - **Walker**: async traversal over any [`Vfs`], with an event-stream
//!   form, cancellation and syscall coalescing
//! - **SyncWalker**: blocking traversal with identical result sets
//! - **walk / walk_sync / walk_stream**: one-call entry points over the
//!   real filesystem
//! - **FsCache**: the per-walk path/stat/symlink caches, injectable for
//!   reuse across walks
//!
//! Pattern semantics come from `sift-match`; this crate decides where
//! to descend, prunes ignored subtrees before listing them, stops
//! globstar descent at symlinked directories unless asked to follow,
//! and shapes results (`mark`, `nodir`, `absolute`, `realpath`,
//! sorting, `nonull`).

mod common;
mod fs;
mod ignore;
mod options;
mod results;
mod state;
mod sync;
mod walker;

#[cfg(test)]
mod memfs;

pub use fs::{FileKind, RealFs, SyncVfs, Vfs};
pub use options::WalkOptions;
pub use state::{FsCache, PathState};
pub use sync::SyncWalker;
pub use walker::Walker;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub use sift_match::PatternError;

/// Errors from walking.
#[derive(Debug, Clone, Error)]
pub enum WalkError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    /// The configured working directory cannot be read. Always fatal,
    /// regardless of `strict` — no results could be meaningful.
    #[error("invalid working directory {0}")]
    InvalidCwd(String),
    /// An unexpected filesystem error under `strict`.
    #[error("cannot read {path}: {message}")]
    Access { path: PathBuf, message: String },
    /// Unsupported option combination.
    #[error("{0}")]
    InvalidOptions(&'static str),
    /// The walk was cancelled through its token.
    #[error("walk aborted")]
    Aborted,
}

/// One event of a streaming walk.
#[derive(Debug, Clone)]
pub enum WalkEvent {
    Match(String),
    Error(WalkError),
}

/// Walk the real filesystem asynchronously and collect all matches.
///
/// Patterns are walked together: results are merged, deduplicated and
/// sorted as one list.
pub async fn walk<S: AsRef<str>>(
    patterns: &[S],
    options: WalkOptions,
) -> Result<Vec<String>, WalkError> {
    Walker::new(Arc::new(RealFs), patterns, options)?
        .collect()
        .await
}

/// Walk the real filesystem, blocking. Produces the same result set as
/// [`walk`] for a static tree.
pub fn walk_sync<S: AsRef<str>>(
    patterns: &[S],
    options: WalkOptions,
) -> Result<Vec<String>, WalkError> {
    SyncWalker::new(RealFs, patterns, options)?.collect()
}

/// A running walk delivering matches as they are found.
///
/// Backpressure is the pause mechanism: while the consumer is not
/// receiving, the internal channel fills and traversal stalls. Dropping
/// the stream or calling [`WalkStream::abort`] cancels the walk.
pub struct WalkStream {
    events: mpsc::Receiver<WalkEvent>,
    token: CancellationToken,
}

impl WalkStream {
    /// Next event, or `None` once the walk has finished.
    pub async fn next_event(&mut self) -> Option<WalkEvent> {
        self.events.recv().await
    }

    /// Cancel the walk. Pending work becomes a no-op; results of
    /// already-issued filesystem calls are discarded on arrival.
    pub fn abort(&self) {
        self.token.cancel();
    }
}

impl Drop for WalkStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Start a streaming walk of the real filesystem on the current tokio
/// runtime.
pub fn walk_stream<S: AsRef<str>>(
    patterns: &[S],
    options: WalkOptions,
) -> Result<WalkStream, WalkError> {
    let walker = Walker::new(Arc::new(RealFs), patterns, options)?;
    let token = walker.cancellation_token();
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(walker.run(tx));
    Ok(WalkStream { events: rx, token })
}
