//! Plural rule grammar: parsing on write, selection on read.
//!
//! A translation is a `|`-separated list of clauses:
//!
//! ```text
//! [*,0] negative|{0} none|{1} one|[2,5] few|[5,*] many
//! ```
//!
//! | Prefix | Range | Example |
//! |--------|-------|---------|
//! | `{n}` | `[n, n+1)` | `{0} none` |
//! | `[lo,hi]` | `[lo, hi)`, `*` = open | `[2,5] few` |
//! | none, first clause | `[0, 2)` | `one apple` |
//! | none, later clause | `[2, +inf)` | `apples` |
//!
//! One space right after the closing bracket is a separator. A backslash
//! escapes the next byte, so `\|` is a literal pipe and `\\|` is a
//! backslash followed by a delimiter.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Bad integer | `{x}` or `[1,x]` | Clause falls back to positional range, payload keeps the prefix |
//! | Unclosed bracket | `{1 apple` | Same positional fallback |
//! | Missing comma | `[1 5] x` | Same positional fallback |
//! | Sentinel literal | `{2147483647}`, `[-2147483648,0]` | Same positional fallback; only `*` is open-ended |
//! | Trailing `|` | `a|` | Ends the last clause; no empty trailing rule |

use smallvec::SmallVec;

use crate::arena::Span;
use crate::rule::{Rule, UNBOUNDED_HIGH, UNBOUNDED_LOW};

/// Rules parsed from one translation, before they enter the table.
pub type ParsedRules = SmallVec<[Rule; 4]>;

/// Byte offsets of one clause relative to the start of the translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Chunk {
    start: usize,
    end: usize,
    raw_end: usize,
}

/// Iterator over the `|`-separated clauses of a translation.
struct Chunks<'a> {
    src: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Chunks<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            pos: 0,
            done: false,
        }
    }
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.done {
            return None;
        }
        let start = self.pos;
        match find_unescaped(self.src, b'|', start) {
            Some(pipe) => {
                let raw_end = pipe + 1;
                self.pos = raw_end;
                self.done = raw_end >= self.src.len();
                Some(Chunk {
                    start,
                    end: pipe,
                    raw_end,
                })
            }
            None => {
                self.done = true;
                let end = self.src.len();
                Some(Chunk {
                    start,
                    end,
                    raw_end: end,
                })
            }
        }
    }
}

/// Position of the first `needle` at or after `from` that is not escaped.
///
/// A backslash consumes the byte after it, so escapes never chain into the
/// following byte.
fn find_unescaped(src: &[u8], needle: u8, from: usize) -> Option<usize> {
    let mut i = from;
    while i < src.len() {
        match src[i] {
            b'\\' => i += 2,
            b if b == needle => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Number of rules `src` would produce.
#[must_use]
pub fn count_rules(src: &[u8]) -> usize {
    Chunks::new(src).count()
}

/// Parse `src`, which lives in the arena at `at`, into rules.
///
/// Never fails: clauses with a malformed formula get the positional range.
#[must_use]
pub fn parse_rules(src: &[u8], at: Span) -> ParsedRules {
    let base = at.offset;
    Chunks::new(src)
        .enumerate()
        .map(|(position, chunk)| {
            let body = &src[chunk.start..chunk.end];
            let (low, high, skip) = parse_formula(body).unwrap_or_else(|| positional(position));
            let text_start = chunk.start + skip;
            Rule {
                low,
                high,
                text: Span::new(base + text_start as u32, (chunk.end - text_start) as u32),
                raw: Span::new(base + chunk.start as u32, (chunk.raw_end - chunk.start) as u32),
            }
        })
        .collect()
}

fn positional(position: usize) -> (i32, i32, usize) {
    if position == 0 {
        (0, 2, 0)
    } else {
        (2, UNBOUNDED_HIGH, 0)
    }
}

/// Parse a `{n}` or `[lo,hi]` prefix.
///
/// Returns the range and the payload offset within `chunk`.
fn parse_formula(chunk: &[u8]) -> Option<(i32, i32, usize)> {
    match chunk.first()? {
        b'{' => {
            let close = find_unescaped(chunk, b'}', 1)?;
            let exact = parse_int(&chunk[1..close])?;
            let high = parse_int_checked(exact.checked_add(1)?)?;
            Some((exact, high, skip_space(chunk, close + 1)))
        }
        b'[' => {
            let close = find_unescaped(chunk, b']', 1)?;
            let inner = &chunk[1..close];
            let comma = inner.iter().position(|&b| b == b',')?;
            let low = parse_bound(&inner[..comma], UNBOUNDED_LOW)?;
            let high = parse_bound(&inner[comma + 1..], UNBOUNDED_HIGH)?;
            Some((low, high, skip_space(chunk, close + 1)))
        }
        _ => None,
    }
}

fn parse_bound(token: &[u8], star: i32) -> Option<i32> {
    if token == b"*" {
        Some(star)
    } else {
        parse_int(token)
    }
}

/// Parse a literal bound. The `*` sentinels are not valid literals.
fn parse_int(token: &[u8]) -> Option<i32> {
    parse_int_checked(std::str::from_utf8(token).ok()?.parse().ok()?)
}

fn parse_int_checked(value: i32) -> Option<i32> {
    (value != UNBOUNDED_LOW && value != UNBOUNDED_HIGH).then_some(value)
}

fn skip_space(chunk: &[u8], at: usize) -> usize {
    if chunk.get(at) == Some(&b' ') {
        at + 1
    } else {
        at
    }
}

/// First rule whose range contains `count`, in declaration order.
#[inline]
#[must_use]
pub fn select(rules: &[Rule], count: i64) -> Option<&Rule> {
    rules.iter().find(|rule| rule.matches(count))
}

/// Span of the full original text behind `rules`.
#[must_use]
pub fn raw_span(rules: &[Rule]) -> Option<Span> {
    let first = rules.first()?;
    let last = rules.last()?;
    Some(first.raw.through(last.raw))
}

/// Turn a payload into its display string.
///
/// Collapses the escape pairs `\|` and `\\`; every other byte is kept.
#[must_use]
pub fn materialize(payload: &[u8]) -> String {
    if !payload.contains(&b'\\') {
        return String::from_utf8_lossy(payload).into_owned();
    }
    let mut out = Vec::with_capacity(payload.len());
    let mut i = 0;
    while i < payload.len() {
        let b = payload[i];
        if b == b'\\' {
            if let Some(&(next @ (b'|' | b'\\'))) = payload.get(i + 1) {
                out.push(next);
                i += 2;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> ParsedRules {
        parse_rules(src.as_bytes(), Span::new(0, src.len() as u32))
    }

    fn text<'a>(src: &'a str, rule: &Rule) -> &'a str {
        &src[rule.text.range()]
    }

    #[test]
    fn single_plain_clause() {
        let src = "Hello there!";
        let rules = parse(src);
        assert_eq!(rules.len(), 1);
        assert_eq!((rules[0].low, rules[0].high), (0, 2));
        assert_eq!(text(src, &rules[0]), "Hello there!");
    }

    #[test]
    fn positional_fallback() {
        let src = "one apple|many apples";
        let rules = parse(src);
        assert_eq!(rules.len(), 2);
        assert_eq!((rules[0].low, rules[0].high), (0, 2));
        assert_eq!((rules[1].low, rules[1].high), (2, UNBOUNDED_HIGH));
        assert_eq!(text(src, &rules[1]), "many apples");
    }

    #[test]
    fn exact_and_range_formulas() {
        let src = "{0} none|[1,19] some|[20,*] many";
        let rules = parse(src);
        assert_eq!(rules.len(), 3);
        assert_eq!((rules[0].low, rules[0].high), (0, 1));
        assert_eq!((rules[1].low, rules[1].high), (1, 19));
        assert_eq!((rules[2].low, rules[2].high), (20, UNBOUNDED_HIGH));
        assert_eq!(text(src, &rules[0]), "none");
        assert_eq!(text(src, &rules[1]), "some");
        assert_eq!(text(src, &rules[2]), "many");
    }

    #[test]
    fn sentinel_literals_fall_back() {
        let src = "{2147483647} max|[-2147483648,0] min|{2147483646} edge";
        let rules = parse(src);
        assert_eq!((rules[0].low, rules[0].high), (0, 2));
        assert_eq!(text(src, &rules[0]), "{2147483647} max");
        assert_eq!((rules[1].low, rules[1].high), (2, UNBOUNDED_HIGH));
        assert_eq!((rules[2].low, rules[2].high), (2, UNBOUNDED_HIGH));
        assert!(!rules[0].matches(i64::from(i32::MAX) + 1));
    }

    #[test]
    fn only_one_space_is_skipped() {
        let src = "{1}  two spaces|{2}none";
        let rules = parse(src);
        assert_eq!(text(src, &rules[0]), " two spaces");
        assert_eq!(text(src, &rules[1]), "none");
    }

    #[test]
    fn negative_and_wildcard_low() {
        let src = "[*,0] A|{-3} B";
        let rules = parse(src);
        assert_eq!((rules[0].low, rules[0].high), (UNBOUNDED_LOW, 0));
        assert_eq!((rules[1].low, rules[1].high), (-3, -2));
    }

    #[test]
    fn malformed_formula_falls_back() {
        let src = "{x} bad|[1 5] nocomma|[1,y] badhi|{3 open";
        let rules = parse(src);
        assert_eq!(rules.len(), 4);
        assert_eq!((rules[0].low, rules[0].high), (0, 2));
        assert_eq!(text(src, &rules[0]), "{x} bad");
        for rule in &rules[1..] {
            assert_eq!((rule.low, rule.high), (2, UNBOUNDED_HIGH));
        }
        assert_eq!(text(src, &rules[3]), "{3 open");
    }

    #[test]
    fn out_of_range_integer_falls_back() {
        let rules = parse("{99999999999} huge");
        assert_eq!((rules[0].low, rules[0].high), (0, 2));
    }

    #[test]
    fn whitespace_inside_range_is_rejected() {
        let rules = parse("[1, 5] x");
        assert_eq!((rules[0].low, rules[0].high), (0, 2));
    }

    #[test]
    fn escaped_pipe_does_not_split() {
        let src = r"a\|b|c";
        let rules = parse(src);
        assert_eq!(rules.len(), 2);
        assert_eq!(text(src, &rules[0]), r"a\|b");
        assert_eq!(materialize(text(src, &rules[0]).as_bytes()), "a|b");
        assert_eq!(text(src, &rules[1]), "c");
    }

    #[test]
    fn escaped_backslash_then_pipe_splits() {
        let src = r"a\\|b";
        let rules = parse(src);
        assert_eq!(rules.len(), 2);
        assert_eq!(materialize(text(src, &rules[0]).as_bytes()), r"a\");
        assert_eq!(text(src, &rules[1]), "b");
    }

    #[test]
    fn trailing_pipe_adds_no_rule() {
        let src = "only|";
        let rules = parse(src);
        assert_eq!(rules.len(), 1);
        assert_eq!(text(src, &rules[0]), "only");
        assert_eq!(rules[0].raw, Span::new(0, 5));
        assert_eq!(count_rules(src.as_bytes()), 1);
    }

    #[test]
    fn interior_empty_clause_is_kept() {
        let src = "a||b";
        let rules = parse(src);
        assert_eq!(rules.len(), 3);
        assert!(rules[1].text.is_empty());
        assert_eq!((rules[2].low, rules[2].high), (2, UNBOUNDED_HIGH));
    }

    #[test]
    fn raw_spans_are_contiguous() {
        let src = "{0} none|{1} one|[2,*] many";
        let rules = parse(src);
        for pair in rules.windows(2) {
            assert_eq!(pair[0].raw.end(), pair[1].raw.offset);
        }
        assert_eq!(raw_span(&rules), Some(Span::new(0, src.len() as u32)));
    }

    #[test]
    fn spans_are_offset_by_base() {
        let src = "{1} one|many";
        let rules = parse_rules(src.as_bytes(), Span::new(100, src.len() as u32));
        assert_eq!(rules[0].text, Span::new(104, 3));
        assert_eq!(rules[1].raw, Span::new(108, 4));
    }

    #[test]
    fn select_first_match_wins() {
        let src = "[0,10] wide|{5} exact";
        let rules = parse(src);
        let hit = select(&rules, 5).unwrap();
        assert_eq!(text(src, hit), "wide");
        assert!(select(&rules, 10).is_none());
    }

    #[test]
    fn count_matches_parse() {
        for src in ["a", "a|b", "a|b|", r"a\|b", "{1} x|[2,*] y|z", "a||b"] {
            assert_eq!(count_rules(src.as_bytes()), parse(src).len(), "{src}");
        }
    }

    #[test]
    fn materialize_keeps_other_escapes() {
        assert_eq!(materialize(br"C:\path"), r"C:\path");
        assert_eq!(materialize("Привет".as_bytes()), "Привет");
    }
}
