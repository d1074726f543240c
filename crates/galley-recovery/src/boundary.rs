//! Boundary location
//!
//! Finds the substring most likely to be the structured payload: the
//! longest bracket-balanced region that parses on its own. Prose around the
//! payload, and smaller parseable fragments quoted inside the prose, lose to
//! it.

use crate::scan::{matching_close, opener_positions};
use crate::validate::structural_parse;

/// Located candidate region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary<'a> {
    /// Region text
    pub text: &'a str,
    /// Byte offset of the region in the searched text
    pub start: usize,
    /// Exclusive byte end
    pub end: usize,
    /// Region parsed without repair
    pub parsed: bool,
}

impl<'a> Boundary<'a> {
    fn new(source: &'a str, start: usize, end: usize, parsed: bool) -> Self {
        Self {
            text: &source[start..end],
            start,
            end,
            parsed,
        }
    }
}

/// Longest independently parseable region, else the naive region
///
/// At most `max_starts` opener positions are tried. `None` only when the
/// text holds no opener at all.
#[must_use]
pub fn locate(text: &str, max_starts: usize) -> Option<Boundary<'_>> {
    let mut best: Option<(usize, usize)> = None;

    for start in opener_positions(text).into_iter().take(max_starts) {
        let Some(end) = matching_close(text, start) else {
            continue;
        };
        if best.is_some_and(|(s, e)| end - start <= e - s) {
            continue;
        }
        if structural_parse(&text[start..end]).is_ok() {
            best = Some((start, end));
        }
    }

    match best {
        Some((start, end)) => Some(Boundary::new(text, start, end, true)),
        None => naive_region(text),
    }
}

/// First opener through the last closer after it
///
/// Runs to end of text when no closer follows, leaving a truncated buffer
/// for bracket completion.
#[must_use]
pub fn naive_region(text: &str) -> Option<Boundary<'_>> {
    let start = text.find(|c| matches!(c, '{' | '['))?;
    let end = text[start..]
        .rfind(|c| matches!(c, '}' | ']'))
        .map_or(text.len(), |offset| start + offset + 1);
    Some(Boundary::new(text, start, end, false))
}
