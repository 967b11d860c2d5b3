//! Pieces shared by the async and sync walkers: pattern preparation,
//! path absolutization, literal-prefix handling and error classification.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use sift_match::{Pattern, Segment};

use crate::WalkError;
use crate::ignore::IgnoreSet;
use crate::options::WalkOptions;
use crate::state::FsCache;

/// One brace-expanded alternative of one input pattern, flattened so
/// the walkers can track matches per alternative (`nonull` reports the
/// literal text of alternatives that matched nothing).
pub(crate) struct SetRef {
    pub(crate) glob: String,
    pub(crate) segments: Vec<Segment>,
}

/// Everything both walkers derive from `(patterns, options)` before
/// touching the filesystem.
pub(crate) struct Prepared {
    pub(crate) opts: WalkOptions,
    pub(crate) cwd: PathBuf,
    pub(crate) sets: Vec<SetRef>,
    pub(crate) ignore: IgnoreSet,
    pub(crate) cache: Arc<FsCache>,
}

pub(crate) fn prepare<S: AsRef<str>>(
    patterns: &[S],
    options: WalkOptions,
) -> Result<Prepared, WalkError> {
    let mut opts = options;
    if opts.nodir {
        opts.mark = true;
    }

    let cwd = match &opts.cwd {
        Some(c) if c.is_absolute() => normalize(c),
        Some(c) => {
            let base = std::env::current_dir()
                .map_err(|e| WalkError::InvalidCwd(e.to_string()))?;
            normalize(&base.join(c))
        }
        None => std::env::current_dir().map_err(|e| WalkError::InvalidCwd(e.to_string()))?,
    };

    let match_opts = opts.match_options();
    let mut sets = Vec::new();
    for pattern in patterns {
        let mut pattern = pattern.as_ref().to_string();
        if opts.match_base && !pattern.contains('/') {
            if opts.noglobstar {
                return Err(WalkError::InvalidOptions(
                    "basename matching requires globstar",
                ));
            }
            pattern = format!("**/{pattern}");
        }
        let compiled = Pattern::new(&pattern, match_opts)?;
        for (i, segments) in compiled.sets().iter().enumerate() {
            sets.push(SetRef {
                glob: compiled.glob_set()[i].clone(),
                segments: segments.clone(),
            });
        }
    }

    let ignore = IgnoreSet::new(&opts.ignore)?;
    let cache = opts
        .cache
        .clone()
        .unwrap_or_else(|| Arc::new(FsCache::new()));

    Ok(Prepared {
        opts,
        cwd,
        sets,
        ignore,
        cache,
    })
}

/// Resolve a result path against the walk root. Absolute inputs stay
/// put; everything else is joined to the cwd and lexically normalized.
pub(crate) fn make_abs(cwd: &Path, f: &str) -> PathBuf {
    if f.starts_with('/') {
        normalize(Path::new(f))
    } else if f.is_empty() {
        cwd.to_path_buf()
    } else {
        normalize(&cwd.join(f))
    }
}

/// Lexical normalization: fold `.`, pop on `..` (saturating at an
/// absolute root). No filesystem access, so symlinks are untouched.
pub(crate) fn normalize(p: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in p.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            c => out.push(c),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// How many leading segments are plain literals. Those can be joined
/// into a directory prefix and read directly, skipping traversal.
pub(crate) fn literal_prefix_len(pattern: &[Segment]) -> usize {
    pattern.iter().take_while(|s| s.is_literal()).count()
}

/// Join the first `n` (literal) segments back into a path string.
pub(crate) fn join_literals(pattern: &[Segment], n: usize) -> String {
    let mut out = String::new();
    for (i, seg) in pattern[..n].iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        if let Segment::Literal(l) = seg {
            out.push_str(l);
        }
    }
    out
}

/// Attach a matched entry name to the directory prefix it was found in.
pub(crate) fn join_prefix(prefix: Option<&str>, entry: &str) -> String {
    match prefix {
        None => entry.to_string(),
        Some("/") => format!("/{entry}"),
        Some(p) => format!("{p}/{entry}"),
    }
}

/// The error classes of §failure semantics: "it's a file", "it's not
/// there", and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IoErrorClass {
    /// `ENOTDIR`/`ENOTSUP`: the prefix exists but is a file.
    NotDir,
    /// `ENOENT`/`ELOOP`/`ENAMETOOLONG`: nothing to match here.
    Missing,
    /// Anything else: fatal under `strict`, skipped otherwise.
    Other,
}

pub(crate) fn classify_io_error(err: &io::Error) -> IoErrorClass {
    use io::ErrorKind::*;
    // `ELOOP` surfaces as `ErrorKind::FilesystemLoop`, which is still
    // unstable (`io_error_more`); detect it via the raw OS error so this
    // keeps compiling on stable without changing the classification.
    #[cfg(unix)]
    {
        #[cfg(target_os = "linux")]
        const ELOOP: i32 = 40;
        #[cfg(not(target_os = "linux"))]
        const ELOOP: i32 = 62;
        if err.raw_os_error() == Some(ELOOP) {
            return IoErrorClass::Missing;
        }
    }
    match err.kind() {
        NotADirectory | Unsupported => IoErrorClass::NotDir,
        NotFound | InvalidFilename => IoErrorClass::Missing,
        _ => IoErrorClass::Other,
    }
}
