//! Syntax repair ladder
//!
//! Each [`Rung`] rewrites the located candidate into something more likely
//! to parse. Rungs are ordered by aggressiveness and each one is a pure
//! function of the candidate, never of a lower rung's output, so a later
//! rung cannot inherit damage done by an earlier one.
//!
//! Every rewrite is confined to text outside double-quoted string literals;
//! annotation text is never touched.

use crate::scan::{
    closer_for, map_outside_strings, opener_for, unclosed_brackets, StringState,
};
use crate::validate::structural_parse;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Upper bound on safe-point cuts tried by completion
const MAX_CUTS: usize = 32;

static LEADING_ZEROS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[\s:,\[{])(-?)0+(\d)").expect("leading zero regex is valid")
});

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma regex is valid"));

static UNQUOTED_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([{,]\s*)([^\s"'{}\[\],:\\]+)(\s*:)"#).expect("unquoted key regex is valid")
});

static LEADING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{\[])(?:\s*,)+").expect("leading comma regex is valid"));

static DOUBLED_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(?:\s*,)+").expect("doubled comma regex is valid"));

static MISSING_COMMA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([}\]])(\s*)([{\[])").expect("missing comma regex is valid")
});

/// One repair strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rung {
    /// Candidate as located
    Verbatim,
    /// Quote, numeric-literal, bareword-value and trailing-comma fixes
    Basic,
    /// Basic plus key quoting, comma and closer corrections
    Enhanced,
    /// Enhanced plus truncation completion
    Completion,
}

impl Rung {
    /// Rungs in the order they are tried
    pub const LADDER: [Rung; 4] = [Rung::Verbatim, Rung::Basic, Rung::Enhanced, Rung::Completion];

    /// Short lowercase name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Rung::Verbatim => "verbatim",
            Rung::Basic => "basic",
            Rung::Enhanced => "enhanced",
            Rung::Completion => "completion",
        }
    }

    /// Rewrite a located candidate
    #[must_use]
    pub fn apply(self, candidate: &str) -> String {
        match self {
            Rung::Verbatim => candidate.to_string(),
            Rung::Basic => basic_repair(candidate),
            Rung::Enhanced => enhanced_repair(candidate),
            Rung::Completion => complete(candidate),
        }
    }
}

impl fmt::Display for Rung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rung 1
#[must_use]
pub fn basic_repair(text: &str) -> String {
    let text = map_outside_strings(text, normalize_quotes);
    let text = strip_leading_zeros(&text);
    let text = quote_barewords(&text, false);
    remove_trailing_commas(&text)
}

/// Rung 2
#[must_use]
pub fn enhanced_repair(text: &str) -> String {
    let text = basic_repair(text);
    let text = convert_single_quotes(&text);
    let text = map_outside_strings(&text, |s| {
        let s = UNQUOTED_KEY.replace_all(s, r#"${1}"${2}"${3}"#);
        let s = LEADING_COMMA.replace_all(&s, "${1}");
        let s = DOUBLED_COMMA.replace_all(&s, ",");
        MISSING_COMMA.replace_all(&s, "${1},${2}${3}").into_owned()
    });
    let text = strip_leading_zeros(&text);
    let text = quote_barewords(&text, true);
    let text = correct_closers(&text);
    remove_trailing_commas(&text)
}

/// Rung 3
///
/// Closes whatever the truncation left open. If the closed text still does
/// not parse, the text is cut back to successively earlier structural safe
/// points and closed again.
#[must_use]
pub fn complete(text: &str) -> String {
    let repaired = enhanced_repair(text);
    let closed = close_dangling(&repaired);
    if structural_parse(&closed).is_ok() {
        return closed;
    }

    safe_points(&repaired)
        .into_iter()
        .rev()
        .take(MAX_CUTS)
        .map(|cut| close_dangling(&repaired[..cut]))
        .find(|attempt| structural_parse(attempt).is_ok())
        .unwrap_or(closed)
}

/// Typographic quotes to ASCII
fn normalize_quotes(segment: &str) -> String {
    segment
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            other => other,
        })
        .collect()
}

fn strip_leading_zeros(text: &str) -> String {
    map_outside_strings(text, |s| {
        LEADING_ZEROS.replace_all(s, "${1}${2}${3}").into_owned()
    })
}

fn remove_trailing_commas(text: &str) -> String {
    map_outside_strings(text, |s| TRAILING_COMMA.replace_all(s, "${1}").into_owned())
}

/// Quote unquoted values after `:` (and, with `in_arrays`, array elements)
fn quote_barewords(text: &str, in_arrays: bool) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut state = StringState::default();
    let mut stack: Vec<u8> = Vec::new();
    let mut expect_value = false;
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if !state.step(byte) {
            expect_value = false;
            i += 1;
            continue;
        }
        match byte {
            b'{' | b'[' => {
                stack.push(byte);
                expect_value = in_arrays && byte == b'[';
            }
            b'}' | b']' => {
                stack.pop();
                expect_value = false;
            }
            b':' => expect_value = true,
            b',' => expect_value = in_arrays && stack.last() == Some(&b'['),
            b if b.is_ascii_whitespace() => {}
            b if expect_value && is_bareword_start(b) => {
                let end = bareword_end(bytes, i);
                let word = text[i..end].trim_end();
                out.push_str(&text[last..i]);
                out.push_str(&bareword_value(word));
                i += word.len();
                last = i;
                expect_value = false;
                continue;
            }
            _ => expect_value = false,
        }
        i += 1;
    }
    out.push_str(&text[last..]);
    out
}

fn is_bareword_start(byte: u8) -> bool {
    !(byte.is_ascii_digit()
        || matches!(
            byte,
            b'-' | b'+' | b'.' | b'\'' | b'"' | b'{' | b'[' | b'}' | b']' | b',' | b':'
        ))
}

fn bareword_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| matches!(b, b',' | b'}' | b']' | b'\n' | b'"'))
        .map_or(bytes.len(), |offset| start + offset)
}

fn bareword_value(word: &str) -> String {
    match word {
        "true" | "false" | "null" => word.to_string(),
        "True" => "true".to_string(),
        "False" => "false".to_string(),
        "None" | "undefined" | "NaN" => "null".to_string(),
        _ => Value::String(word.to_string()).to_string(),
    }
}

/// Single-quoted strings to double-quoted ones
fn convert_single_quotes(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if state.step(bytes[i]) && bytes[i] == b'\'' {
            if let Some(close) = single_quote_end(bytes, i) {
                out.push_str(&text[last..i]);
                out.push_str(&requote(&text[i + 1..close]));
                i = close + 1;
                last = i;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&text[last..]);
    out
}

/// Closing quote of a single-quoted literal
///
/// A `'` only closes when the next non-space byte ends a value or key, so
/// apostrophes inside the text survive.
fn single_quote_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut escaped = false;
    for (offset, &byte) in bytes[start + 1..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' => escaped = true,
            b'\n' => return None,
            b'\'' => {
                let at = start + 1 + offset;
                let next = bytes[at + 1..].iter().find(|b| !b.is_ascii_whitespace());
                if matches!(next, None | Some(b',' | b':' | b'}' | b']')) {
                    return Some(at);
                }
            }
            _ => {}
        }
    }
    None
}

fn requote(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len() + 2);
    out.push('"');
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Fix closers that do not match the innermost open bracket
///
/// A mismatched closer becomes the right one; a closer with nothing open is
/// dropped.
fn correct_closers(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();
    let mut stack: Vec<u8> = Vec::new();
    let mut last = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if !state.step(byte) {
            continue;
        }
        match byte {
            b'{' | b'[' => stack.push(byte),
            b'}' | b']' => {
                if stack.last().copied() == opener_for(byte) {
                    stack.pop();
                    continue;
                }
                out.push_str(&text[last..i]);
                if let Some(close) = stack.pop().and_then(closer_for) {
                    out.push(char::from(close));
                }
                last = i + 1;
            }
            _ => {}
        }
    }
    out.push_str(&text[last..]);
    out
}

/// Close a truncated tail, then append the missing closers
fn close_dangling(text: &str) -> String {
    let scan = unclosed_brackets(text);
    let mut out = text.to_string();
    if scan.escaped {
        out.pop();
    }
    if scan.in_string {
        out.push('"');
    }

    out.truncate(out.trim_end().len());
    if out.ends_with(',') {
        out.pop();
    } else if out.ends_with(':') {
        out.push_str(" null");
    }
    out.push_str(&scan.closers());
    remove_trailing_commas(&out)
}

/// Cut positions: before each structural comma, after each bracket
fn safe_points(text: &str) -> Vec<usize> {
    let mut state = StringState::default();
    text.bytes()
        .enumerate()
        .filter(|&(_, byte)| state.step(byte))
        .filter_map(|(i, byte)| match byte {
            b',' => Some(i),
            b'{' | b'[' | b'}' | b']' => Some(i + 1),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parses(text: &str) -> bool {
        structural_parse(text).is_ok()
    }

    #[test]
    fn verbatim_is_identity() {
        assert_eq!(Rung::Verbatim.apply("{oops"), "{oops");
    }

    #[test]
    fn basic_fixes_numbers_barewords_and_commas() {
        let out = basic_repair(r#"{"n": 007, "m": -00.5, "kind": error, "ok": true,}"#);
        assert_eq!(out, r#"{"n": 7, "m": -0.5, "kind": "error", "ok": true}"#);
    }

    #[test]
    fn basic_normalizes_typographic_quotes() {
        let out = basic_repair("{\u{201C}kind\u{201D}: \u{201C}error\u{201D}}");
        assert_eq!(out, r#"{"kind": "error"}"#);
    }

    #[test]
    fn basic_leaves_string_contents_alone() {
        let text = r#"{"original": "007, x: y,]", "q": "“quoted”"}"#;
        assert_eq!(basic_repair(text), text);
    }

    #[test]
    fn basic_maps_foreign_literals() {
        assert_eq!(basic_repair(r#"{"a": True, "b": None}"#), r#"{"a": true, "b": null}"#);
    }

    #[test]
    fn enhanced_quotes_keys_and_single_quotes() {
        let out = enhanced_repair("{kind: 'error', 'original': 'it's', reason: x}");
        assert_eq!(out, r#"{"kind": "error", "original": "it's", "reason": "x"}"#);
        assert!(parses(&out));
    }

    #[test]
    fn enhanced_fixes_commas_and_adjacent_objects() {
        let out = enhanced_repair(r#"[,{"a": 1},, {"b": 2}{"c": 3}]"#);
        assert_eq!(out, r#"[{"a": 1}, {"b": 2},{"c": 3}]"#);
    }

    #[test]
    fn enhanced_quotes_array_barewords() {
        assert_eq!(enhanced_repair("[error, 01, warning]"), r#"["error", 1, "warning"]"#);
    }

    #[test]
    fn enhanced_corrects_closers() {
        assert_eq!(enhanced_repair(r#"[{"a": 1]]"#), r#"[{"a": 1}]"#);
        assert_eq!(enhanced_repair(r#"{"a": 1}}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn completion_closes_truncated_string_and_brackets() {
        let out = complete(r#"{"items": [{"kind": "error", "original": "teh"#);
        assert_eq!(out, r#"{"items": [{"kind": "error", "original": "teh"}]}"#);
    }

    #[test]
    fn completion_handles_dangling_tails() {
        assert_eq!(complete(r#"{"a": 1, "b":"#), r#"{"a": 1, "b": null}"#);
        assert_eq!(complete("[1, 2, "), "[1, 2]");
        assert!(parses(&complete(r#"{"a": "x\"#)));
    }

    #[test]
    fn completion_cuts_back_to_safe_point() {
        let out = complete(r#"{"a": [1, 2], "b": {"c": 1, "d""#);
        assert_eq!(out, r#"{"a": [1, 2], "b": {"c": 1}}"#);
        assert!(parses(&complete("[1, 2.")));
    }

    #[test]
    fn rungs_are_idempotent() {
        let inputs = [
            r#"{kind: error, "n": 007,}"#,
            r#"[{'a': 'b'}{"c": 1]"#,
            r#"{"items": [{"kind": "err"#,
        ];
        for input in inputs {
            for rung in Rung::LADDER {
                let once = rung.apply(input);
                if parses(&once) {
                    assert_eq!(rung.apply(&once), once, "{rung} on {input}");
                }
            }
        }
    }

    #[test]
    fn rung_names() {
        let names: Vec<String> = Rung::LADDER.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["verbatim", "basic", "enhanced", "completion"]);
    }
}
