//! URL pattern compilation and matching
//!
//! A pattern is compiled once into a short op list, then verified against
//! the request URL with a small backtracking matcher. `/regex/` patterns are
//! delegated to the `regex` crate.

use regex::{Regex, RegexBuilder};

use crate::error::RuleSyntaxError;
use crate::url::{domain_anchor_positions, is_separator_char};

/// Pattern ops, in the order they must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternOp {
    /// Literal text
    Lit(Vec<u8>),
    /// `*` wildcard
    SkipAny,
    /// `^` separator or end of URL
    Separator,
}

/// Where the first op is allowed to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    None,
    /// `|` at pattern start
    Start,
    /// `||` at pattern start
    Domain,
}

/// A compiled URL pattern.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Empty pattern; matches every URL.
    Any,
    Simple {
        anchor: Anchor,
        ops: Vec<PatternOp>,
        /// `|` at pattern end
        end_anchor: bool,
    },
    Regex(Regex),
}

impl Pattern {
    /// Compile pattern text. Literals are lower-cased unless `match_case`.
    pub fn compile(text: &str, match_case: bool) -> Result<Self, RuleSyntaxError> {
        if is_regex_pattern(text) {
            let source = &text[1..text.len() - 1];
            return RegexBuilder::new(source)
                .case_insensitive(!match_case)
                .build()
                .map(Pattern::Regex)
                .map_err(|e| RuleSyntaxError::InvalidRegex {
                    pattern: text.to_string(),
                    reason: e.to_string(),
                });
        }

        let (anchor, rest) = if let Some(rest) = text.strip_prefix("||") {
            (Anchor::Domain, rest)
        } else if let Some(rest) = text.strip_prefix('|') {
            (Anchor::Start, rest)
        } else {
            (Anchor::None, text)
        };

        let (end_anchor, rest) = match rest.strip_suffix('|') {
            Some(rest) => (true, rest),
            None => (false, rest),
        };

        let mut ops = Vec::new();
        let mut lit = Vec::new();
        for &b in rest.as_bytes() {
            match b {
                b'*' | b'^' => {
                    if !lit.is_empty() {
                        ops.push(PatternOp::Lit(std::mem::take(&mut lit)));
                    }
                    if b == b'^' {
                        ops.push(PatternOp::Separator);
                    } else if ops.last() != Some(&PatternOp::SkipAny) {
                        ops.push(PatternOp::SkipAny);
                    }
                }
                _ => lit.push(if match_case { b } else { b.to_ascii_lowercase() }),
            }
        }
        if !lit.is_empty() {
            ops.push(PatternOp::Lit(lit));
        }

        // Leading wildcard is implied by an unanchored pattern.
        if anchor == Anchor::None && ops.first() == Some(&PatternOp::SkipAny) {
            ops.remove(0);
        }

        if ops.is_empty() && anchor == Anchor::None && !end_anchor {
            return Ok(Pattern::Any);
        }

        Ok(Pattern::Simple {
            anchor,
            ops,
            end_anchor,
        })
    }

    /// Check the pattern against a URL. `text` must be the lower-cased URL
    /// unless the pattern was compiled with `match_case`.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Pattern::Any => true,
            Pattern::Regex(re) => re.is_match(text),
            Pattern::Simple {
                anchor,
                ops,
                end_anchor,
            } => {
                let bytes = text.as_bytes();
                match anchor {
                    Anchor::Start => match_ops(ops, bytes, 0, *end_anchor),
                    Anchor::Domain => domain_anchor_positions(text)
                        .any(|pos| match_ops(ops, bytes, pos, *end_anchor)),
                    Anchor::None => match ops.first() {
                        Some(PatternOp::Lit(lit)) => {
                            find_each(bytes, 0, lit, |pos| match_ops(ops, bytes, pos, *end_anchor))
                        }
                        _ => (0..=bytes.len()).any(|pos| match_ops(ops, bytes, pos, *end_anchor)),
                    },
                }
            }
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Pattern::Regex(_))
    }
}

fn match_ops(ops: &[PatternOp], text: &[u8], pos: usize, end_anchor: bool) -> bool {
    let (op, rest) = match ops.split_first() {
        Some(split) => split,
        None => return !end_anchor || pos == text.len(),
    };

    match op {
        PatternOp::Lit(lit) => {
            text[pos..].starts_with(lit) && match_ops(rest, text, pos + lit.len(), end_anchor)
        }
        PatternOp::Separator => {
            if pos == text.len() {
                match_ops(rest, text, pos, end_anchor)
            } else {
                is_separator_char(text[pos]) && match_ops(rest, text, pos + 1, end_anchor)
            }
        }
        PatternOp::SkipAny => {
            if rest.is_empty() {
                return true;
            }
            match rest.first() {
                Some(PatternOp::Lit(lit)) => {
                    find_each(text, pos, lit, |p| match_ops(rest, text, p, end_anchor))
                }
                _ => (pos..=text.len()).any(|p| match_ops(rest, text, p, end_anchor)),
            }
        }
    }
}

/// Call `f` with every position at or after `from` where `needle` occurs,
/// stopping at the first `true`.
fn find_each(
    haystack: &[u8],
    from: usize,
    needle: &[u8],
    mut f: impl FnMut(usize) -> bool,
) -> bool {
    let mut start = from;
    while let Some(i) = find_bytes(&haystack[start..], needle) {
        if f(start + i) {
            return true;
        }
        start += i + 1;
    }
    false
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn is_regex_pattern(text: &str) -> bool {
    text.len() > 2 && text.starts_with('/') && text.ends_with('/')
}

/// Extract the shortcut: the longest lower-cased run of pattern text free of
/// `*`, `^` and `|`. Regex patterns have no shortcut.
pub fn find_shortcut(text: &str) -> String {
    if is_regex_pattern(text) {
        return String::new();
    }

    text.split(['*', '^', '|'])
        .fold("", |longest, part| if part.len() > longest.len() { part } else { longest })
        .to_ascii_lowercase()
}
