//! sift-match: shell-style glob pattern compiling and path matching.
//!
//! Provides:
//! - **Pattern**: a compiled glob with brace expansion, `**` (globstar),
//!   character classes, extended-glob groups and `!` negation
//! - **match_literal / filter_list**: one-shot string tests with the same
//!   semantics
//! - **has_magic**: does a string need glob machinery at all?
//! - **expand**: standalone brace expansion
//!
//! Everything here is pure string work — no filesystem access. The
//! traversal side (walking a tree with these patterns, pruning ignored
//! subtrees, symlink handling) lives in `sift-walk`, which consumes the
//! compiled [`Pattern`] form through [`Pattern::sets`].

mod brace;
mod options;
mod pattern;
mod translate;

pub use brace::expand;
pub use options::MatchOptions;
pub use pattern::Pattern;
pub use translate::{Segment, SegmentMatcher};

use thiserror::Error;

/// Hard ceiling on accepted pattern length: 64 KiB.
///
/// Everything below it compiles (malformed syntax degrades to literal
/// text or a never-matching segment); anything above it is rejected
/// outright before any parsing happens.
pub const MAX_PATTERN_LENGTH: usize = 64 * 1024;

/// Errors from pattern compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern is too long: {0} bytes exceeds {MAX_PATTERN_LENGTH}")]
    TooLong(usize),
}

/// Test a single candidate path against a pattern. No I/O.
///
/// # Examples
/// ```
/// use sift_match::{MatchOptions, match_literal};
///
/// let opts = MatchOptions::default();
/// assert!(match_literal("src/main.rs", "src/*.rs", &opts).unwrap());
/// assert!(match_literal("a/b", "a/**/b", &opts).unwrap());
/// assert!(!match_literal("a/.git/b", "a/**/b", &opts).unwrap());
/// ```
pub fn match_literal(
    candidate: &str,
    pattern: &str,
    options: &MatchOptions,
) -> Result<bool, PatternError> {
    // comments match nothing, no point compiling
    if !options.nocomment && pattern.starts_with('#') {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(PatternError::TooLong(pattern.len()));
        }
        return Ok(false);
    }
    Ok(Pattern::new(pattern, *options)?.matches(candidate))
}

/// Filter a list of candidate paths down to those matching the pattern.
///
/// With [`MatchOptions::nonull`], an empty result yields the pattern
/// itself, the way an unmatched glob echoes back in a shell.
pub fn filter_list<S: AsRef<str>>(
    candidates: &[S],
    pattern: &str,
    options: &MatchOptions,
) -> Result<Vec<String>, PatternError> {
    let compiled = Pattern::new(pattern, *options)?;
    let mut out: Vec<String> = candidates
        .iter()
        .map(|c| c.as_ref())
        .filter(|c| compiled.matches(c))
        .map(str::to_string)
        .collect();
    if options.nonull && out.is_empty() {
        out.push(pattern.to_string());
    }
    Ok(out)
}

/// Compile a pattern into a single regex covering every brace
/// alternative, for callers embedding it in their own matching loop.
///
/// `None` when the compiled set is empty (a comment, an empty pattern,
/// or braces that expanded to nothing) — there is no regex to hand out.
/// Note the path matcher itself never goes through this form:
/// [`Pattern::matches`] is segment-by-segment and strictly more precise
/// around `**` boundaries.
pub fn compile_to_regex(
    pattern: &str,
    options: &MatchOptions,
) -> Result<Option<fancy_regex::Regex>, PatternError> {
    Ok(Pattern::new(pattern, *options)?.to_regex())
}

/// True if the pattern contains anything beyond literal path segments.
///
/// Callers use this to skip glob machinery entirely when an argument is
/// just a path: a deletion tool, say, can unlink the literal name
/// instead of walking the tree.
pub fn has_magic(pattern: &str, options: &MatchOptions) -> Result<bool, PatternError> {
    Ok(Pattern::new(pattern, *options)?.has_magic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_literal_basics() {
        let opts = MatchOptions::default();
        assert!(match_literal("src/index.ts", "src/index.ts", &opts).unwrap());
        assert!(!match_literal("src/Index.ts", "src/index.ts", &opts).unwrap());
        let nocase = MatchOptions {
            nocase: true,
            ..Default::default()
        };
        assert!(match_literal("src/Index.ts", "src/index.ts", &nocase).unwrap());
    }

    #[test]
    fn match_literal_rejects_comments() {
        let opts = MatchOptions::default();
        assert!(!match_literal("#tag", "#tag", &opts).unwrap());
    }

    #[test]
    fn filter_list_keeps_order() {
        let opts = MatchOptions::default();
        let got = filter_list(
            &["src/index.ts", "src/util.test.ts", "README.md"],
            "src/*.ts",
            &opts,
        )
        .unwrap();
        assert_eq!(got, ["src/index.ts", "src/util.test.ts"]);
    }

    #[test]
    fn filter_list_nonull_echoes_pattern() {
        let opts = MatchOptions {
            nonull: true,
            ..Default::default()
        };
        let got = filter_list(&["a", "b"], "*.xyz", &opts).unwrap();
        assert_eq!(got, ["*.xyz"]);
    }

    #[test]
    fn has_magic_detection() {
        let opts = MatchOptions::default();
        assert!(!has_magic("src/main.rs", &opts).unwrap());
        assert!(has_magic("src/*.rs", &opts).unwrap());
        assert!(has_magic("{a,b}", &opts).unwrap());
        assert!(!has_magic("a\\*b", &opts).unwrap());
    }

    #[test]
    fn compile_to_regex_surface() {
        let opts = MatchOptions::default();
        let re = compile_to_regex("*.{rs,go}", &opts).unwrap().unwrap();
        assert!(re.is_match("main.rs").unwrap());
        assert!(re.is_match("main.go").unwrap());
        assert!(!re.is_match("main.py").unwrap());
        assert!(compile_to_regex("#comment", &opts).unwrap().is_none());
    }

    #[test]
    fn too_long_is_the_only_hard_failure() {
        let opts = MatchOptions::default();
        let long = "x".repeat(MAX_PATTERN_LENGTH + 1);
        assert!(match_literal("x", &long, &opts).is_err());
        // garbage syntax still compiles to something
        assert!(match_literal("[z-a](", "[z-a](", &opts).unwrap());
    }
}
