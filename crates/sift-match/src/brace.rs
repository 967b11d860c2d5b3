//! Brace expansion: `{a,b}`, `{1..5}`, `{a..e..2}`, nested and escaped.
//!
//! Expansion happens before any glob compilation, rewriting one pattern
//! into the Cartesian set of literal alternatives:
//!
//! - `a{b,c}d` → `abd acd`
//! - `a{1..3}` → `a1 a2 a3`
//! - `a{b,c{d,e}f}g` → `abg acdfg acefg`
//!
//! Invalid sets are not expanded: `a{2..}b` and `a{b}c` pass through
//! unchanged.

// Escaped delimiters are swapped for NUL-delimited placeholders before
// expansion and restored afterwards, so `\{`, `\}`, `\,` and `\.` never
// participate in brace or sequence syntax.
const ESC_SLASH: &str = "\0SLASH\0";
const ESC_OPEN: &str = "\0OPEN\0";
const ESC_CLOSE: &str = "\0CLOSE\0";
const ESC_COMMA: &str = "\0COMMA\0";
const ESC_PERIOD: &str = "\0PERIOD\0";

/// Expand all brace expressions in `pattern`.
///
/// Returns the ordered sequence of alternatives. A pattern without brace
/// syntax expands to itself; the empty pattern expands to nothing.
///
/// A leading `{}` is taken literally rather than expanded: `{},a}b`
/// expands to nothing special while `a{},b}c` gives `a}c abc`. This
/// mirrors how Bash 4.3 treats a bare `{}` at the start of a word, and
/// is intentional.
pub fn expand(pattern: &str) -> Vec<String> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let escaped = if let Some(rest) = pattern.strip_prefix("{}") {
        format!("\\{{\\}}{rest}")
    } else {
        pattern.to_string()
    };
    expand_inner(&escape_braces(&escaped), true)
        .into_iter()
        .map(|s| unescape_braces(&s))
        .collect()
}

/// Expansion entry used by the pattern compiler: skips the machinery
/// entirely when the pattern has no `{...}` span or `nobrace` is set.
pub(crate) fn brace_expand(pattern: &str, nobrace: bool) -> Vec<String> {
    if nobrace || !has_brace_span(pattern) {
        return vec![pattern.to_string()];
    }
    expand(pattern)
}

/// True if the pattern contains a `{` later closed by `}` with no `{`
/// in between (the cheapest sufficient test for "expansion could apply").
fn has_brace_span(pattern: &str) -> bool {
    let mut open = false;
    for c in pattern.chars() {
        match c {
            '{' => open = true,
            '}' if open => return true,
            _ => {}
        }
    }
    false
}

fn escape_braces(s: &str) -> String {
    s.replace("\\\\", ESC_SLASH)
        .replace("\\{", ESC_OPEN)
        .replace("\\}", ESC_CLOSE)
        .replace("\\,", ESC_COMMA)
        .replace("\\.", ESC_PERIOD)
}

fn unescape_braces(s: &str) -> String {
    s.replace(ESC_SLASH, "\\\\")
        .replace(ESC_OPEN, "{")
        .replace(ESC_CLOSE, "}")
        .replace(ESC_COMMA, ",")
        .replace(ESC_PERIOD, ".")
}

/// Locate the span of the first balanced `{...}` pair.
///
/// Returns byte offsets of the `{` and its matching `}`. When the string
/// holds a top-level balanced pair that one is returned; otherwise the
/// leftmost completed inner pair is (so `{x{a,b}` still finds `{a,b}`).
fn balanced(s: &str) -> Option<(usize, usize)> {
    let mut stack: Vec<usize> = Vec::new();
    let mut best: Option<(usize, usize)> = None;
    for (i, c) in s.char_indices() {
        match c {
            '{' => stack.push(i),
            '}' => {
                if let Some(open) = stack.pop() {
                    if stack.is_empty() {
                        return Some((open, i));
                    }
                    match best {
                        Some((l, _)) if open >= l => {}
                        _ => best = Some((open, i)),
                    }
                }
            }
            _ => {}
        }
    }
    best
}

/// Split brace body on top-level commas, keeping nested braced sections
/// intact: `a,{b,c},d` → `a`, `{b,c}`, `d`.
fn parse_comma_parts(s: &str) -> Vec<String> {
    if s.is_empty() {
        return vec![String::new()];
    }
    let Some((start, end)) = balanced(s) else {
        return s.split(',').map(str::to_string).collect();
    };
    let pre = &s[..start];
    let body = &s[start + 1..end];
    let post = &s[end + 1..];

    let mut parts: Vec<String> = pre.split(',').map(str::to_string).collect();
    {
        let last = parts.last_mut().expect("split yields at least one part");
        last.push('{');
        last.push_str(body);
        last.push('}');
    }
    let mut post_parts = parse_comma_parts(post);
    if !post.is_empty() {
        let first = post_parts.remove(0);
        parts.last_mut().expect("non-empty").push_str(&first);
        parts.append(&mut post_parts);
    }
    parts
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_numeric_sequence(body: &str) -> bool {
    let parts: Vec<&str> = body.split("..").collect();
    matches!(parts.len(), 2 | 3) && parts.iter().all(|p| is_integer(p))
}

fn is_alpha_sequence(body: &str) -> bool {
    let parts: Vec<&str> = body.split("..").collect();
    matches!(parts.len(), 2 | 3)
        && parts[..2]
            .iter()
            .all(|p| p.len() == 1 && p.bytes().all(|b| b.is_ascii_alphabetic()))
        && (parts.len() == 2 || is_integer(parts[2]))
}

/// Sequence endpoint value: an integer if it parses as one, otherwise
/// the code point of its first character (alpha sequences).
fn numeric(s: &str) -> i64 {
    s.parse::<i64>()
        .unwrap_or_else(|_| s.chars().next().map_or(0, |c| c as i64))
}

fn is_padded(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut bytes = digits.bytes();
    bytes.next() == Some(b'0') && bytes.next().is_some_and(|b| b.is_ascii_digit())
}

fn expand_sequence(parts: &[String], alpha: bool) -> Vec<String> {
    let x = numeric(&parts[0]);
    let y = numeric(&parts[1]);
    let width = parts[0].len().max(parts[1].len());
    let mut incr: i64 = if parts.len() == 3 {
        numeric(&parts[2]).abs().max(1)
    } else {
        1
    };
    let reverse = y < x;
    if reverse {
        incr = -incr;
    }
    let pad = parts.iter().any(|p| is_padded(p));

    let mut out = Vec::new();
    let mut i = x;
    while if reverse { i >= y } else { i <= y } {
        if alpha {
            match u32::try_from(i).ok().and_then(char::from_u32) {
                // a generated backslash would corrupt escapes downstream
                Some('\\') | None => out.push(String::new()),
                Some(c) => out.push(c.to_string()),
            }
        } else {
            let mut c = i.to_string();
            if pad {
                let need = width.saturating_sub(c.len());
                if need > 0 {
                    let zeros = "0".repeat(need);
                    c = if i < 0 {
                        format!("-{zeros}{}", &c[1..])
                    } else {
                        format!("{zeros}{c}")
                    };
                }
            }
            out.push(c);
        }
        i += incr;
    }
    out
}

fn expand_inner(s: &str, is_top: bool) -> Vec<String> {
    let Some((start, end)) = balanced(s) else {
        return vec![s.to_string()];
    };
    let pre = &s[..start];
    // a `${...}` span is shell parameter syntax, not an expansion
    if pre.ends_with('$') {
        return vec![s.to_string()];
    }
    let body = &s[start + 1..end];
    let post = &s[end + 1..];

    let numeric_seq = is_numeric_sequence(body);
    let alpha_seq = is_alpha_sequence(body);
    let is_seq = numeric_seq || alpha_seq;
    let is_options = body.contains(',');

    if !is_seq && !is_options {
        // `{a},b}` — the first close brace belongs to the literal text;
        // protect it and rescan
        if post
            .find(',')
            .is_some_and(|i| post[i..].contains('}'))
        {
            let retried = format!("{pre}{{{body}{ESC_CLOSE}{post}");
            return expand_inner(&retried, false);
        }
        return vec![s.to_string()];
    }

    let mut n: Vec<String>;
    if is_seq {
        n = body.split("..").map(str::to_string).collect();
    } else {
        n = parse_comma_parts(body);
        if n.len() == 1 {
            // x{{a,b}}y => x{a}y x{b}y
            n = expand_inner(&n[0], false)
                .into_iter()
                .map(|p| format!("{{{p}}}"))
                .collect();
            if n.len() == 1 {
                let post_exp = if post.is_empty() {
                    vec![String::new()]
                } else {
                    expand_inner(post, false)
                };
                return post_exp
                    .into_iter()
                    .map(|p| format!("{pre}{}{p}", n[0]))
                    .collect();
            }
        }
    }

    let post_exp = if post.is_empty() {
        vec![String::new()]
    } else {
        expand_inner(post, false)
    };

    let filled: Vec<String> = if is_seq {
        expand_sequence(&n, alpha_seq)
    } else {
        n.iter().flat_map(|el| expand_inner(el, false)).collect()
    };

    let mut out = Vec::with_capacity(filled.len() * post_exp.len());
    for item in &filled {
        for p in &post_exp {
            let expansion = format!("{pre}{item}{p}");
            if !is_top || is_seq || !expansion.is_empty() {
                out.push(expansion);
            }
        }
    }
    out
}
