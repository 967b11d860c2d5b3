//! Matcher configuration.

/// Options recognized by the pattern compiler and path matcher.
///
/// All fields default to `false`. Unknown concerns (filesystem traversal,
/// result marking, ignore lists) live in `sift-walk`'s `WalkOptions`, not
/// here: this struct only affects how a pattern string compiles and how a
/// candidate path string is tested against it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Allow wildcard segments to match names starting with `.`.
    /// Without this, `*` and `**` never match dotfiles (a pattern segment
    /// that itself starts with `.` always may).
    pub dot: bool,
    /// Case-insensitive matching. Forces every segment down the regex
    /// path, so literal fast-path comparisons are also case-folded.
    pub nocase: bool,
    /// Disable `{a,b}` brace expansion.
    pub nobrace: bool,
    /// Treat `**` as an ordinary `*` instead of the zero-or-more-segments
    /// globstar.
    pub noglobstar: bool,
    /// Disable extended glob groups `@()`, `!()`, `+()`, `*()`, `?()`.
    pub noext: bool,
    /// Treat a leading `!` as a literal character instead of negation.
    pub nonegate: bool,
    /// Treat a leading `#` as a literal character instead of a comment
    /// (a comment pattern matches nothing).
    pub nocomment: bool,
    /// When filtering a list yields no matches, return the pattern itself
    /// as the single result, the way unmatched globs echo back in a shell.
    pub nonull: bool,
    /// A pattern without any `/` matches against the basename of the
    /// candidate path: `*.rs` matches `src/main.rs`.
    pub match_base: bool,
    /// Report the raw set-match result without applying negation.
    /// Only useful for diagnostics.
    pub flip_negate: bool,
    /// Default partial-match mode: a candidate that is a prefix of what
    /// the pattern requires counts as a match. The walker uses this to
    /// decide whether descending further could still succeed.
    pub partial: bool,
    /// On Windows, keep `\` as an escape character instead of normalizing
    /// it to `/` before compilation. No effect on other platforms.
    pub allow_windows_escape: bool,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }
}
