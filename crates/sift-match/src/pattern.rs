//! Compiled glob patterns and the segment-by-segment path matcher.

use fancy_regex::Regex;

use crate::brace::brace_expand;
use crate::options::MatchOptions;
use crate::translate::{Segment, translate, two_star};
use crate::{MAX_PATTERN_LENGTH, PatternError};

/// A compiled glob pattern.
///
/// Compilation brace-expands the pattern into a set of alternatives,
/// splits each on `/`, and translates every segment (§`translate`). A
/// candidate path matches when at least one alternative matches it; a
/// leading `!` inverts the overall result.
///
/// Compilation never fails on strange input — malformed syntax degrades
/// to literal text or a never-matching segment. The one hard error is a
/// pattern longer than [`MAX_PATTERN_LENGTH`].
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    pattern: String,
    options: MatchOptions,
    negate: bool,
    comment: bool,
    empty: bool,
    glob_set: Vec<String>,
    set: Vec<Vec<Segment>>,
}

impl Pattern {
    pub fn new(pattern: &str, options: MatchOptions) -> Result<Self, PatternError> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(PatternError::TooLong(pattern.len()));
        }

        #[allow(unused_mut)]
        let mut trimmed = pattern.trim().to_string();
        // windows: accept \ as a path separator unless the caller wants
        // it kept as an escape character
        #[cfg(windows)]
        if !options.allow_windows_escape {
            trimmed = trimmed.replace('\\', "/");
        }

        let mut this = Pattern {
            raw: pattern.to_string(),
            pattern: trimmed,
            options,
            negate: false,
            comment: false,
            empty: false,
            glob_set: Vec::new(),
            set: Vec::new(),
        };
        this.make();
        Ok(this)
    }

    fn make(&mut self) {
        // comments and empty patterns match nothing
        if !self.options.nocomment && self.pattern.starts_with('#') {
            self.comment = true;
            return;
        }
        if self.pattern.is_empty() {
            self.empty = true;
            return;
        }

        self.parse_negate();
        self.glob_set = brace_expand(&self.pattern, self.options.nobrace);
        self.set = self
            .glob_set
            .iter()
            .map(|alt| {
                split_slashes(alt)
                    .iter()
                    .map(|seg| translate(seg, &self.options))
                    .collect()
            })
            .collect();
    }

    fn parse_negate(&mut self) {
        if self.options.nonegate {
            return;
        }
        let mut negate = false;
        let mut offset = 0;
        for c in self.pattern.chars() {
            if c != '!' {
                break;
            }
            negate = !negate;
            offset += 1;
        }
        if offset > 0 {
            self.pattern = self.pattern[offset..].to_string();
        }
        self.negate = negate;
    }

    /// The pattern text as given, before trimming and negation parsing.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The brace-expanded alternatives.
    pub fn glob_set(&self) -> &[String] {
        &self.glob_set
    }

    /// The compiled alternatives, one segment list per brace expansion.
    pub fn sets(&self) -> &[Vec<Segment>] {
        &self.set
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn negated(&self) -> bool {
        self.negate
    }

    pub fn is_comment(&self) -> bool {
        self.comment
    }

    pub fn is_empty_pattern(&self) -> bool {
        self.empty
    }

    /// True if the pattern needs more than literal string comparison:
    /// wildcards somewhere, or several brace alternatives.
    pub fn has_magic(&self) -> bool {
        if self.set.len() > 1 {
            return true;
        }
        self.set
            .first()
            .is_some_and(|s| s.iter().any(|p| !p.is_literal()))
    }

    /// Test a candidate path, in the default partial mode of the options.
    pub fn matches(&self, path: &str) -> bool {
        self.matches_partial(path, self.options.partial)
    }

    /// Test a candidate path. With `partial`, a path that is a prefix of
    /// what the pattern could eventually match also counts.
    pub fn matches_partial(&self, path: &str, partial: bool) -> bool {
        if self.comment {
            return false;
        }
        if self.empty {
            return path.is_empty();
        }
        if path == "/" && partial {
            return true;
        }

        #[cfg(windows)]
        let path = &path.replace('\\', "/");

        let parts = split_slashes(path);
        // basename for match_base: the last non-empty segment
        let filename = parts
            .iter()
            .rev()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| parts.first().cloned().unwrap_or_default());

        // one matching alternative suffices; for a negated pattern one
        // hit means overall failure
        for pattern in &self.set {
            let base_file;
            let file: &[String] = if self.options.match_base && pattern.len() == 1 {
                base_file = [filename.clone()];
                &base_file
            } else {
                &parts
            };
            if self.match_one(file, pattern, partial) {
                return if self.options.flip_negate {
                    true
                } else {
                    !self.negate
                };
            }
        }

        if self.options.flip_negate {
            false
        } else {
            self.negate
        }
    }

    /// Lockstep walk of path segments against pattern segments, with
    /// recursive backtracking for globstar.
    fn match_one(&self, file: &[String], pattern: &[Segment], partial: bool) -> bool {
        let options = &self.options;
        let fl = file.len();
        let pl = pattern.len();
        let mut fi = 0usize;
        let mut pi = 0usize;

        while fi < fl && pi < pl {
            match &pattern[pi] {
                Segment::GlobStar => {
                    let mut fr = fi;
                    let pr = pi + 1;
                    if pr == pl {
                        // trailing ** swallows everything left, but
                        // never . or .. and dotfiles only when asked
                        for part in &file[fi..] {
                            if part == "." || part == ".." || (!options.dot && part.starts_with('.'))
                            {
                                return false;
                            }
                        }
                        return true;
                    }
                    // zero-match first, then swallow a segment and retry
                    while fr < fl {
                        let swallowee = &file[fr];
                        if self.match_one(&file[fr..], &pattern[pr..], partial) {
                            return true;
                        }
                        if swallowee == "."
                            || swallowee == ".."
                            || (!options.dot && swallowee.starts_with('.'))
                        {
                            break;
                        }
                        fr += 1;
                    }
                    // out of path in partial mode: descending further
                    // could still produce a match
                    return partial && fr == fl;
                }
                Segment::Literal(lit) => {
                    if &file[fi] != lit {
                        return false;
                    }
                }
                Segment::Matcher(m) => {
                    if !m.is_match(&file[fi]) {
                        return false;
                    }
                }
            }
            fi += 1;
            pi += 1;
        }

        if fi == fl && pi == pl {
            // exact hit
            true
        } else if fi == fl {
            // out of path with pattern left over
            partial
        } else {
            // out of pattern: acceptable only for the final empty
            // segment of a path with a trailing slash (a/* matches a/b/)
            fi == fl - 1 && file[fi].is_empty()
        }
    }

    /// Assemble the whole pattern into one regex, or `None` when the
    /// compiled set is empty (comment, empty pattern, empty expansion).
    pub fn to_regex(&self) -> Option<Regex> {
        if self.set.is_empty() {
            return None;
        }
        let ts = two_star(&self.options);
        let body = self
            .set
            .iter()
            .map(|pattern| {
                pattern
                    .iter()
                    .map(|p| match p {
                        Segment::GlobStar => ts.to_string(),
                        Segment::Literal(l) => regex_escape(l),
                        Segment::Matcher(m) => m.regex_source().to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect::<Vec<_>>()
            .join("|");

        let mut re = format!("^(?:{body})$");
        if self.negate {
            re = format!("^(?!{re}).*$");
        }
        if self.options.nocase {
            re = format!("(?i){re}");
        }
        Regex::new(&re).ok()
    }
}

/// Split on runs of `/`, keeping leading and trailing empty segments:
/// `"/a//b/"` → `["", "a", "b", ""]`.
pub(crate) fn split_slashes(s: &str) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    let mut cur = String::new();
    let mut in_sep = false;
    for c in s.chars() {
        if c == '/' {
            if !in_sep {
                parts.push(std::mem::take(&mut cur));
                in_sep = true;
            }
        } else {
            in_sep = false;
            cur.push(c);
        }
    }
    parts.push(cur);
    parts
}

fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '-' | '['
                | ']'
                | '{'
                | '}'
                | '('
                | ')'
                | '*'
                | '+'
                | '?'
                | '.'
                | ','
                | '\\'
                | '^'
                | '$'
                | '|'
                | '#'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pat(p: &str) -> Pattern {
        Pattern::new(p, MatchOptions::default()).expect("pattern compiles")
    }

    fn pat_with(p: &str, options: MatchOptions) -> Pattern {
        Pattern::new(p, options).expect("pattern compiles")
    }

    #[test]
    fn split_keeps_edges_and_collapses_runs() {
        assert_eq!(split_slashes("a/b"), ["a", "b"]);
        assert_eq!(split_slashes("a//b"), ["a", "b"]);
        assert_eq!(split_slashes("/a"), ["", "a"]);
        assert_eq!(split_slashes("a/"), ["a", ""]);
        assert_eq!(split_slashes("/"), ["", ""]);
        assert_eq!(split_slashes(""), [""]);
    }

    #[test]
    fn literal_patterns_match_exactly() {
        let p = pat("src/index.ts");
        assert!(p.matches("src/index.ts"));
        assert!(!p.matches("src/Index.ts"));
        assert!(!p.matches("index.ts"));
        assert!(!p.has_magic());
    }

    #[test]
    fn nocase_literal() {
        let p = pat_with(
            "src/index.ts",
            MatchOptions {
                nocase: true,
                ..Default::default()
            },
        );
        assert!(p.matches("src/Index.ts"));
        assert!(p.matches("SRC/INDEX.TS"));
        assert!(!p.matches("src/index2.ts"));
    }

    #[rstest]
    #[case("a/**/b", "a/b", true)] // zero segments
    #[case("a/**/b", "a/x/b", true)]
    #[case("a/**/b", "a/x/y/z/b", true)]
    #[case("a/**/b", "a/b/c", false)]
    #[case("a/**/b/**/c", "a/b/x/y/z/c", true)]
    #[case("**", "a/b/c", true)]
    #[case("**/*.test.ts", "src/util.test.ts", true)]
    #[case("**/*.test.ts", "src/util.ts", false)]
    fn globstar(#[case] pattern: &str, #[case] path: &str, #[case] want: bool) {
        assert_eq!(pat(pattern).matches(path), want, "{pattern} vs {path}");
    }

    #[test]
    fn globstar_refuses_dotfiles() {
        let p = pat("a/**/b");
        assert!(!p.matches("a/.git/b"));
        let dotted = pat_with(
            "a/**/b",
            MatchOptions {
                dot: true,
                ..Default::default()
            },
        );
        assert!(dotted.matches("a/.git/b"));
        assert!(!dotted.matches("a/./b"));
        assert!(!dotted.matches("a/../b"));
    }

    #[test]
    fn trailing_slash_cases() {
        assert!(pat("a/*").matches("a/b/"));
        assert!(!pat("a/b/").matches("a/b"));
        assert!(pat("a/b/").matches("a/b/"));
    }

    #[test]
    fn negation_inverts() {
        let plain = pat("*.spec.ts");
        let negated = pat("!*.spec.ts");
        for candidate in ["a.spec.ts", "a.ts", "spec.ts", ".spec.ts"] {
            assert_eq!(
                plain.matches(candidate),
                !negated.matches(candidate),
                "{candidate}"
            );
        }
        assert!(negated.negated());
    }

    #[test]
    fn double_negation_cancels() {
        let p = pat("!!*.ts");
        assert!(!p.negated());
        assert!(p.matches("a.ts"));
    }

    #[test]
    fn flip_negate_reports_raw_result() {
        let p = pat_with(
            "!*.ts",
            MatchOptions {
                flip_negate: true,
                ..Default::default()
            },
        );
        assert!(p.matches("a.ts"));
        assert!(!p.matches("a.rs"));
    }

    #[test]
    fn nonegate_keeps_bang_literal() {
        let p = pat_with(
            "!important",
            MatchOptions {
                nonegate: true,
                ..Default::default()
            },
        );
        assert!(p.matches("!important"));
        assert!(!p.matches("important"));
    }

    #[test]
    fn comments_match_nothing() {
        let p = pat("#nope");
        assert!(p.is_comment());
        assert!(!p.matches("#nope"));
        assert!(!p.matches("nope"));

        let literal = pat_with(
            "#hash",
            MatchOptions {
                nocomment: true,
                ..Default::default()
            },
        );
        assert!(literal.matches("#hash"));
    }

    #[test]
    fn empty_pattern_matches_empty_path() {
        let p = pat("");
        assert!(p.is_empty_pattern());
        assert!(p.matches(""));
        assert!(!p.matches("a"));
    }

    #[test]
    fn match_base_uses_basename() {
        let opts = MatchOptions {
            match_base: true,
            ..Default::default()
        };
        let p = pat_with("*.rs", opts);
        assert!(p.matches("src/deep/main.rs"));
        assert!(p.matches("main.rs"));
        assert!(!p.matches("src/main.rs.bak"));
    }

    #[test]
    fn partial_prefix_matching() {
        let p = pat("/a/b/*/d");
        assert!(p.matches_partial("/a/b", true));
        assert!(p.matches_partial("/a/b/c", true));
        assert!(!p.matches_partial("/x/b", true));
        assert!(!p.matches_partial("/a/b", false));
        assert!(p.matches_partial("/", true));
    }

    #[test]
    fn brace_alternatives_or_together() {
        let p = pat("*.{rs,go}");
        assert!(p.matches("main.rs"));
        assert!(p.matches("main.go"));
        assert!(!p.matches("main.py"));
        assert!(p.has_magic());
        assert_eq!(p.glob_set(), ["*.rs", "*.go"]);
    }

    #[test]
    fn has_magic_on_braces_without_wildcards() {
        assert!(pat("{a,b}").has_magic());
        assert!(!pat("plain/path").has_magic());
        assert!(pat("pla?n").has_magic());
    }

    #[test]
    fn compile_is_idempotent() {
        let a = pat("src/**/*.{ts,tsx}");
        let b = pat("src/**/*.{ts,tsx}");
        for candidate in [
            "src/a.ts",
            "src/deep/b.tsx",
            "src/.hidden/c.ts",
            "lib/a.ts",
            "src/a.js",
        ] {
            assert_eq!(a.matches(candidate), b.matches(candidate), "{candidate}");
        }
    }

    #[test]
    fn to_regex_covers_whole_pattern() {
        let re = pat("src/**/*.rs").to_regex().expect("regex form");
        assert!(re.is_match("src/a/main.rs").unwrap());
        assert!(re.is_match("src/a/b/main.rs").unwrap());
        assert!(!re.is_match("lib/main.rs").unwrap());

        // dotfile rule carries over to the single-regex form
        let all = pat("**").to_regex().expect("regex form");
        assert!(all.is_match("a/b").unwrap());
        assert!(!all.is_match(".hidden").unwrap());
        assert!(!all.is_match("a/.hidden").unwrap());
    }

    #[test]
    fn to_regex_none_for_empty_set() {
        assert!(pat("#comment").to_regex().is_none());
        assert!(pat("").to_regex().is_none());
    }

    #[test]
    fn to_regex_negated() {
        let re = pat("!*.rs").to_regex().expect("regex form");
        assert!(!re.is_match("main.rs").unwrap());
        assert!(re.is_match("main.go").unwrap());
    }

    #[test]
    fn pattern_length_ceiling() {
        let long = "a".repeat(MAX_PATTERN_LENGTH + 1);
        assert!(matches!(
            Pattern::new(&long, MatchOptions::default()),
            Err(PatternError::TooLong(_))
        ));
        let ok = "a".repeat(MAX_PATTERN_LENGTH);
        assert!(Pattern::new(&ok, MatchOptions::default()).is_ok());
    }

    #[test]
    fn noglobstar_degrades_to_star() {
        let p = pat_with(
            "a/**/b",
            MatchOptions {
                noglobstar: true,
                ..Default::default()
            },
        );
        assert!(p.matches("a/x/b"));
        assert!(!p.matches("a/x/y/b"));
        assert!(!p.matches("a/b"));
    }
}
