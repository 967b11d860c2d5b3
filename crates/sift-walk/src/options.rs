//! Walk configuration.

use std::path::PathBuf;
use std::sync::Arc;

use sift_match::MatchOptions;

use crate::state::FsCache;

/// Options recognized by [`crate::Walker`] and [`crate::SyncWalker`].
///
/// Matching-related fields mirror [`MatchOptions`]; the rest control
/// traversal and result shaping. Everything defaults to `false`/empty
/// except `strict`, which defaults to `true`: an unexpected filesystem
/// error aborts the walk unless the caller opts out.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Directory the walk starts from and relative results are rooted
    /// at. `None` means the process working directory.
    pub cwd: Option<PathBuf>,
    /// Match dotfiles with wildcard segments.
    pub dot: bool,
    /// Case-insensitive matching.
    pub nocase: bool,
    /// Patterns without `/` match against basenames (prepends `**/`).
    pub match_base: bool,
    /// Disable `**` semantics.
    pub noglobstar: bool,
    /// Disable brace expansion.
    pub nobrace: bool,
    /// Disable extended glob groups.
    pub noext: bool,
    /// Suffix directory results with `/`.
    pub mark: bool,
    /// Exclude directories from results (implies `mark`).
    pub nodir: bool,
    /// Follow symlinked directories during `**` descent. Off by
    /// default: a symlinked directory is read but not recursed through,
    /// which bounds traversal on cyclic links.
    pub follow: bool,
    /// Resolve results to canonical paths as a final pass. Results that
    /// fail to resolve fall back to their absolute form.
    pub realpath: bool,
    /// Return absolute paths.
    pub absolute: bool,
    /// Suppress diagnostics for skipped, unreadable branches.
    pub silent: bool,
    /// Treat unexpected filesystem errors as fatal. On by default.
    pub strict: bool,
    /// Keep results in traversal order instead of sorting.
    pub nosort: bool,
    /// Keep duplicate results produced by overlapping pattern sets.
    pub nounique: bool,
    /// A pattern set with no matches contributes its literal pattern
    /// text to the results.
    pub nonull: bool,
    /// Patterns excluded from results. A pattern ending in `/**` also
    /// prunes descent into the whole subtree, before any directory
    /// listing is issued.
    pub ignore: Vec<String>,
    /// Inject a cache shared across walks. The caller owns it and must
    /// drop it when the underlying tree changes.
    pub cache: Option<Arc<FsCache>>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            dot: false,
            nocase: false,
            match_base: false,
            noglobstar: false,
            nobrace: false,
            noext: false,
            mark: false,
            nodir: false,
            follow: false,
            realpath: false,
            absolute: false,
            silent: false,
            strict: true,
            nosort: false,
            nounique: false,
            nonull: false,
            ignore: Vec::new(),
            cache: None,
        }
    }
}

impl WalkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The matcher options for compiling walk patterns. Negation and
    /// comments are meaningless in a filesystem walk, so both are
    /// disabled regardless of how the walk is configured.
    pub(crate) fn match_options(&self) -> MatchOptions {
        MatchOptions {
            dot: self.dot,
            nocase: self.nocase,
            match_base: self.match_base,
            noglobstar: self.noglobstar,
            nobrace: self.nobrace,
            noext: self.noext,
            nonegate: true,
            nocomment: true,
            ..MatchOptions::default()
        }
    }
}
