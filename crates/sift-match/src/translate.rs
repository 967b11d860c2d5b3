//! Glob-to-regex translation for a single path segment.
//!
//! Each `/`-separated piece of a brace-expanded pattern compiles to one
//! of three things: a plain string (no metacharacters — matched by
//! equality, no regex built at all), the globstar marker (`**` alone in
//! the segment), or a compiled regex wrapping the segment's wildcards,
//! character classes and extended-glob groups.
//!
//! The translator works character by character rather than by fragment
//! substitution so escapes, classes and nested `!()`/`@()` groups
//! compose the way a shell user expects. `!()` needs negative lookahead,
//! which is why the regexes are `fancy_regex` rather than plain `regex`.

use std::sync::Arc;

use fancy_regex::Regex;

use crate::options::MatchOptions;

/// A single non-slash character.
pub(crate) const QMARK: &str = "[^/]";
/// Zero or more non-slash characters.
pub(crate) const STAR: &str = "[^/]*?";
/// `**` when dotfiles are allowed: anything except `.` and `..` segments.
pub(crate) const TWO_STAR_DOT: &str = r"(?:(?!(?:/|^)(?:\.{1,2})($|/)).)*?";
/// `**` by default: anything not containing a `/.` (or leading-dot) part.
pub(crate) const TWO_STAR_NO_DOT: &str = r"(?:(?!(?:/|^)\.).)*?";
/// Substitute for a segment whose translation failed to compile: a
/// class that matches no character at all, so the segment matches nothing.
const NEVER_MATCH: &str = r"^[^\s\S]$";

/// Byte length of the tail of the `!()` group closer (`)[^/]*?)`), used
/// when splicing the look-to-end extension into the built regex.
const NEG_CLOSE_TAIL: usize = 8;

fn pl_open(kind: char) -> &'static str {
    match kind {
        '!' => "(?:(?!(?:",
        _ => "(?:",
    }
}

fn pl_close(kind: char) -> &'static str {
    match kind {
        '!' => "))[^/]*?)",
        '?' => ")?",
        '+' => ")+",
        '*' => ")*",
        _ => ")",
    }
}

fn is_re_special(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '.' | '*' | '{' | '}' | '+' | '?' | '[' | ']' | '^' | '$' | '\\' | '!'
    )
}

/// One compiled path segment.
#[derive(Debug, Clone)]
pub enum Segment {
    /// No metacharacters: matched by string equality.
    Literal(String),
    /// Wildcards present: matched by the compiled regex.
    Matcher(SegmentMatcher),
    /// `**` alone in the segment: matches zero or more whole segments.
    GlobStar,
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

/// Compiled regex for one segment, plus the glob text it came from.
#[derive(Debug, Clone)]
pub struct SegmentMatcher {
    regex: Arc<Regex>,
    source: Arc<str>,
    re_src: Arc<str>,
}

impl SegmentMatcher {
    /// Test one path segment (must not contain `/`).
    pub fn is_match(&self, candidate: &str) -> bool {
        // a backtrack-limit blowup counts as a non-match, never an error
        self.regex.is_match(candidate).unwrap_or(false)
    }

    /// The original glob text of this segment.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The regex fragment (unanchored) this segment compiled to.
    pub fn regex_source(&self) -> &str {
        &self.re_src
    }
}

/// The `**` regex used when assembling a whole-pattern regex.
pub(crate) fn two_star(options: &MatchOptions) -> &'static str {
    if options.noglobstar {
        STAR
    } else if options.dot {
        TWO_STAR_DOT
    } else {
        TWO_STAR_NO_DOT
    }
}

/// Translate one segment of a brace-expanded, slash-split pattern.
pub(crate) fn translate(glob: &str, options: &MatchOptions) -> Segment {
    let mut pattern = glob;
    // `**` is only special when it is the whole segment
    if pattern == "**" {
        if !options.noglobstar {
            return Segment::GlobStar;
        }
        pattern = "*";
    }
    if pattern.is_empty() {
        return Segment::Literal(String::new());
    }

    match parse_inner(pattern, options, false) {
        ParseOut::Literal(text) => Segment::Literal(text),
        ParseOut::Re { src, .. } => {
            let anchored = if options.nocase {
                format!("(?i)^{src}$")
            } else {
                format!("^{src}$")
            };
            let regex = Regex::new(&anchored)
                .or_else(|_| Regex::new(NEVER_MATCH))
                .expect("never-match fallback regex is valid");
            Segment::Matcher(SegmentMatcher {
                regex: Arc::new(regex),
                source: Arc::from(glob),
                re_src: Arc::from(src.as_str()),
            })
        }
    }
}

enum ParseOut {
    Literal(String),
    Re { src: String, has_magic: bool },
}

fn parse_sub(pattern: &str, options: &MatchOptions) -> (String, bool) {
    match parse_inner(pattern, options, true) {
        ParseOut::Re { src, has_magic } => (src, has_magic),
        ParseOut::Literal(_) => unreachable!("sub-parse always yields a regex fragment"),
    }
}

struct PatternList {
    kind: char,
    re_start: usize,
    open_len: usize,
}

fn clear_state(state_char: &mut Option<char>, re: &mut String, has_magic: &mut bool) {
    if let Some(sc) = state_char.take() {
        match sc {
            '*' => {
                re.push_str(STAR);
                *has_magic = true;
            }
            '?' => {
                re.push_str(QMARK);
                *has_magic = true;
            }
            c => {
                re.push('\\');
                re.push(c);
            }
        }
    }
}

fn parse_inner(pattern: &str, options: &MatchOptions, is_sub: bool) -> ParseOut {
    if pattern.is_empty() {
        return if is_sub {
            ParseOut::Re {
                src: String::new(),
                has_magic: false,
            }
        } else {
            ParseOut::Literal(String::new())
        };
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut re = String::new();
    // nocase forces the regex path so literal comparisons fold case too
    let mut has_magic = options.nocase;
    let mut escaping = false;
    let mut state_char: Option<char> = None;
    let mut pl_stack: Vec<PatternList> = Vec::new();
    let mut negative_lists: Vec<(usize, usize)> = Vec::new();
    let mut in_class = false;
    let mut class_start: isize = -1;
    let mut re_class_start: usize = 0;

    // `.` and `..` never match anything that doesn't start with `.`,
    // even when `dot` is set
    let pattern_start = if chars.first() == Some(&'.') {
        ""
    } else if options.dot {
        r"(?!(?:^|/)\.{1,2}(?:$|/))"
    } else {
        r"(?!\.)"
    };

    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];

        if escaping && is_re_special(c) {
            re.push('\\');
            re.push(c);
            escaping = false;
            i += 1;
            continue;
        }

        match c {
            // segments are split on '/' before translation; a slash here
            // means the caller handed us something unmatchable
            '/' => {
                return ParseOut::Re {
                    src: r"[^\s\S]".to_string(),
                    has_magic: true,
                };
            }

            '\\' => {
                clear_state(&mut state_char, &mut re, &mut has_magic);
                escaping = true;
            }

            '?' | '*' | '+' | '@' | '!' => {
                if in_class {
                    // literal inside a class, except glob [!a] means [^a]
                    let cc = if c == '!' && i as isize == class_start + 1 {
                        '^'
                    } else {
                        c
                    };
                    re.push(cc);
                } else {
                    clear_state(&mut state_char, &mut re, &mut has_magic);
                    state_char = Some(c);
                    // without extglob, `+(a|b)` isn't a group; settle now
                    if options.noext {
                        clear_state(&mut state_char, &mut re, &mut has_magic);
                    }
                }
            }

            '(' => {
                if in_class {
                    re.push('(');
                } else if let Some(sc) = state_char.take() {
                    pl_stack.push(PatternList {
                        kind: sc,
                        re_start: re.len(),
                        open_len: pl_open(sc).len(),
                    });
                    re.push_str(pl_open(sc));
                } else {
                    re.push_str("\\(");
                }
            }

            ')' => {
                if in_class || pl_stack.is_empty() {
                    re.push_str("\\)");
                } else {
                    clear_state(&mut state_char, &mut re, &mut has_magic);
                    has_magic = true;
                    let pl = pl_stack.pop().expect("stack checked non-empty");
                    re.push_str(pl_close(pl.kind));
                    if pl.kind == '!' {
                        negative_lists.push((pl.re_start, re.len()));
                    }
                }
            }

            '|' => {
                if in_class || pl_stack.is_empty() || escaping {
                    re.push_str("\\|");
                    escaping = false;
                } else {
                    clear_state(&mut state_char, &mut re, &mut has_magic);
                    re.push('|');
                }
            }

            '[' => {
                clear_state(&mut state_char, &mut re, &mut has_magic);
                if in_class {
                    re.push_str("\\[");
                } else {
                    in_class = true;
                    class_start = i as isize;
                    re_class_start = re.len();
                    re.push('[');
                }
            }

            ']' => {
                // a right bracket first in the list is a literal member,
                // per POSIX 2.8.3.2
                if i as isize == class_start + 1 || !in_class {
                    re.push_str("\\]");
                    escaping = false;
                } else {
                    // validate the accumulated class the way the final
                    // engine will see it
                    if Regex::new(&format!("{}]", &re[re_class_start..])).is_ok() {
                        has_magic = true;
                        in_class = false;
                        re.push(']');
                    } else {
                        let cs: String = chars[(class_start as usize + 1)..i].iter().collect();
                        // invalid class, e.g. [z-a]: degrade the whole
                        // bracket expression to literal text
                        let (sp, sp_magic) = parse_sub(&cs, options);
                        re.truncate(re_class_start);
                        re.push_str("\\[");
                        re.push_str(&sp);
                        re.push_str("\\]");
                        has_magic = has_magic || sp_magic;
                        in_class = false;
                    }
                }
            }

            _ => {
                clear_state(&mut state_char, &mut re, &mut has_magic);
                if escaping {
                    escaping = false;
                } else if is_re_special(c) && !(c == '^' && in_class) {
                    re.push('\\');
                }
                re.push(c);
            }
        }

        i += 1;
    }

    // an unterminated class, "[abc", is the literal text "[abc"
    if in_class {
        let cs: String = chars[(class_start as usize + 1)..].iter().collect();
        let (sp, sp_magic) = parse_sub(&cs, options);
        re.truncate(re_class_start);
        re.push_str("\\[");
        re.push_str(&sp);
        has_magic = has_magic || sp_magic;
    }

    // unterminated extglob groups: the opener becomes literal text and
    // any `|` inside loses its alternation meaning
    while let Some(pl) = pl_stack.pop() {
        let tail_start = pl.re_start + pl.open_len;
        let tail = escape_unprotected_pipes(&re[tail_start..]);
        let t = match pl.kind {
            '*' => STAR.to_string(),
            '?' => QMARK.to_string(),
            k => format!("\\{k}"),
        };
        has_magic = true;
        re = format!("{}{}\\({}", &re[..pl.re_start], t, tail);
    }

    clear_state(&mut state_char, &mut re, &mut has_magic);
    if escaping {
        re.push_str("\\\\");
    }

    let add_pattern_start = matches!(re.chars().next(), Some('[' | '.' | '('));

    // A `!()` lookahead must see all the way to the end of the segment:
    // `*.!(x).!(y)` may not match `a.x.y` just because the lookahead for
    // `x` stopped early. Splice the rest of the pattern (and an end
    // anchor when there is no rest) into each negative lookahead.
    for &(nl_start, nl_end) in negative_lists.iter().rev() {
        let nl_before = re[..nl_start].to_string();
        let nl_first = re[nl_start..nl_end - NEG_CLOSE_TAIL].to_string();
        let mut nl_last = re[nl_end - NEG_CLOSE_TAIL..nl_end].to_string();
        let nl_after_orig = re[nl_end..].to_string();
        nl_last.push_str(&nl_after_orig);

        let open_parens_before = nl_before.matches('(').count();
        let mut nl_after = nl_after_orig;
        for _ in 0..open_parens_before {
            nl_after = remove_first_group_close(&nl_after);
        }
        let dollar = if nl_after.is_empty() && !is_sub { "$" } else { "" };
        re = format!("{nl_before}{nl_first}{nl_after}{dollar}{nl_last}");
    }

    // a magic segment must never match the empty string: a/* should not
    // match a/
    if !re.is_empty() && has_magic {
        re = format!("(?=.){re}");
    }
    if add_pattern_start {
        re = format!("{pattern_start}{re}");
    }

    if is_sub {
        return ParseOut::Re { src: re, has_magic };
    }
    if !has_magic {
        return ParseOut::Literal(glob_unescape(pattern));
    }
    ParseOut::Re { src: re, has_magic }
}

/// Escape any `|` not already escaped, doubling the even backslash runs
/// that precede it so the text survives re-emission as literal context.
fn escape_unprotected_pipes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let mut run = 1usize;
            while chars.peek() == Some(&'\\') {
                chars.next();
                run += 1;
            }
            if chars.peek() == Some(&'|') {
                chars.next();
                for _ in 0..2 * (run - run % 2) {
                    out.push('\\');
                }
                out.push_str("\\|");
            } else {
                for _ in 0..run {
                    out.push('\\');
                }
            }
        } else if c == '|' {
            out.push_str("\\|");
        } else {
            out.push(c);
        }
    }
    out
}

/// Remove the first `)` (plus a trailing quantifier) from `s`.
fn remove_first_group_close(s: &str) -> String {
    match s.find(')') {
        None => s.to_string(),
        Some(i) => {
            let mut end = i + 1;
            if matches!(s[end..].chars().next(), Some('+' | '*' | '?')) {
                end += 1;
            }
            format!("{}{}", &s[..i], &s[end..])
        }
    }
}

/// Strip glob escapes: `\*` becomes `*`.
fn glob_unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut it = s.chars();
    while let Some(c) = it.next() {
        if c == '\\' {
            match it.next() {
                Some(n) => out.push(n),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
