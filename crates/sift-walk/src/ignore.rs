//! Ignore patterns: exclusion at emission time, and subtree pruning for
//! patterns that end in `/**`.

use sift_match::{MatchOptions, Pattern, PatternError};

struct IgnoreEntry {
    matcher: Pattern,
    /// For a pattern ending in `/**`: the prefix pattern that names the
    /// directory whose entire subtree is excluded. Descent below a
    /// directory it matches is pruned without listing it.
    gmatcher: Option<Pattern>,
}

/// The compiled ignore list of one walk.
#[derive(Default)]
pub(crate) struct IgnoreSet {
    entries: Vec<IgnoreEntry>,
}

impl IgnoreSet {
    pub(crate) fn new(patterns: &[String]) -> Result<Self, PatternError> {
        // ignore patterns always see dotfiles
        let opts = MatchOptions {
            dot: true,
            ..MatchOptions::default()
        };
        let mut entries = Vec::with_capacity(patterns.len());
        for p in patterns {
            let gmatcher = if p.ends_with("/**") {
                let mut prefix = p.as_str();
                while let Some(stripped) = prefix.strip_suffix("/**") {
                    prefix = stripped;
                }
                Some(Pattern::new(prefix, opts)?)
            } else {
                None
            };
            entries.push(IgnoreEntry {
                matcher: Pattern::new(p, opts)?,
                gmatcher,
            });
        }
        Ok(Self { entries })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if the path is excluded from results.
    pub(crate) fn is_ignored(&self, path: &str) -> bool {
        self.entries.iter().any(|e| {
            e.matcher.matches(path)
                || e.gmatcher.as_ref().is_some_and(|g| g.matches(path))
        })
    }

    /// True if everything below the path is excluded, so the walk need
    /// not list it at all.
    pub(crate) fn children_ignored(&self, path: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.gmatcher.as_ref().is_some_and(|g| g.matches(path)))
    }
}
