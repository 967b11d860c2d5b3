//! Result aggregation shared by both walkers: per-set dedup, merging,
//! sorting, `mark`/`nodir` shaping and final ignore filtering.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use crate::common::{SetRef, make_abs};
use crate::ignore::IgnoreSet;
use crate::options::WalkOptions;
use crate::state::FsCache;

/// Matches of one pattern set: deduplicated, in emission order.
#[derive(Debug, Default)]
pub(crate) struct MatchSet {
    pub(crate) order: Vec<String>,
    seen: HashSet<String>,
}

impl MatchSet {
    /// Insert a match; false if it was already present.
    pub(crate) fn insert(&mut self, m: String) -> bool {
        if self.seen.insert(m.clone()) {
            self.order.push(m);
            true
        } else {
            false
        }
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }
}

/// Case-insensitive comparison with a byte-order tiebreak, so `B`
/// sorts next to `b` rather than before `a`.
pub(crate) fn alphasort(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Merge per-set matches into the final result list.
pub(crate) fn finish(
    sets: &[SetRef],
    matches: Vec<MatchSet>,
    cache: &FsCache,
    ignore: &IgnoreSet,
    opts: &WalkOptions,
    cwd: &Path,
) -> Vec<String> {
    let mut all: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut push = |all: &mut Vec<String>, seen: &mut HashSet<String>, m: String| {
        if opts.nounique {
            all.push(m);
        } else if seen.insert(m.clone()) {
            all.push(m);
        }
    };

    for (i, set) in matches.into_iter().enumerate() {
        if set.order.is_empty() {
            if opts.nonull {
                // like a shell: an unmatched glob is returned verbatim
                push(&mut all, &mut seen, sets[i].glob.clone());
            }
        } else {
            for m in set.order {
                push(&mut all, &mut seen, m);
            }
        }
    }

    if !opts.nosort {
        all.sort_by(|a, b| alphasort(a, b));
    }

    if opts.mark {
        all = all.into_iter().map(|p| mark(cache, cwd, &p)).collect();
        if opts.nodir {
            all.retain(|e| {
                if e.ends_with('/') {
                    return false;
                }
                let state = cache
                    .path_state(Path::new(e))
                    .or_else(|| cache.path_state(&make_abs(cwd, e)));
                match state {
                    Some(st) => !st.is_dir(),
                    None => true,
                }
            });
        }
    }

    if !ignore.is_empty() {
        all.retain(|m| !ignore.is_ignored(m));
    }

    all
}

/// Suffix a directory result with `/` (or strip a stray one from a
/// file), consulting what the walk learned about the path.
pub(crate) fn mark(cache: &FsCache, cwd: &Path, p: &str) -> String {
    let abs = make_abs(cwd, p);
    let mut m = p.to_string();
    if let Some(state) = cache.path_state(&abs) {
        let is_dir = state.is_dir();
        let slash = m.ends_with('/');
        if is_dir && !slash {
            m.push('/');
        } else if !is_dir && slash {
            m.pop();
        }
        if m != p {
            let mabs = make_abs(cwd, &m);
            cache.copy_entries(&abs, &mabs);
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphasort_is_case_insensitive_first() {
        let mut v = vec!["b", "A", "a", "B"];
        v.sort_by(|x, y| alphasort(x, y));
        assert_eq!(v, ["A", "a", "B", "b"]);
    }

    #[test]
    fn match_set_dedupes() {
        let mut s = MatchSet::default();
        assert!(s.insert("a".into()));
        assert!(!s.insert("a".into()));
        assert!(s.insert("b".into()));
        assert_eq!(s.order, ["a", "b"]);
    }
}
