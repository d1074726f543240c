//! Markup and fence stripping

use crate::scan::{has_opener, StringState};

const FENCE: &str = "```";

/// Interior of the best fenced code block
///
/// A fence is a run of three backticks at the start of a line (after
/// optional indentation) and outside every string literal; backticks quoted
/// in annotation text never count. Among fenced blocks whose interior holds
/// a `{` or `[`, the one with the longest interior wins (ties: earliest).
/// An unclosed fence runs to end of text. `None` when there is no such
/// block.
#[must_use]
pub fn select_fence(text: &str) -> Option<&str> {
    let mut markers = fence_markers(text).into_iter();
    let mut best: Option<&str> = None;

    while let Some(open) = markers.next() {
        let open_end = open + FENCE.len();
        let body_start = open_end + info_string_len(&text[open_end..]);
        let body_end = markers.next().unwrap_or(text.len()).max(body_start);

        let body = &text[body_start..body_end];
        if has_opener(body) && best.map_or(true, |b| body.len() > b.len()) {
            best = Some(body);
        }
    }
    best
}

/// Byte offsets of line-leading fence markers outside string literals
fn fence_markers(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut markers = Vec::new();
    let mut state = StringState::default();
    let mut line_start = true;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if line_start && !state.in_string() && bytes[i..].starts_with(FENCE.as_bytes()) {
            markers.push(i);
            line_start = false;
            i += FENCE.len();
            continue;
        }
        let structural = state.step(byte);
        line_start = byte == b'\n' || (line_start && structural && matches!(byte, b' ' | b'\t'));
        i += 1;
    }
    markers
}

/// Length of a language tag directly after an opening fence
fn info_string_len(text: &str) -> usize {
    text.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'+' | b'.'))
        .count()
}

/// Remove angle-bracket tags outside string literals
///
/// A tag is `<` followed by a letter, `/`, `!` or `?`, through the next `>`.
/// A would-be tag body that runs into `<` or a bracket is not a tag and is
/// kept.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        if state.step(byte) && byte == b'<' {
            if let Some(end) = tag_end(bytes, i) {
                out.push_str(&text[last..i]);
                last = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&text[last..]);
    out
}

/// Exclusive end of the tag opened at `start`, if it is one
fn tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let first = *bytes.get(start + 1)?;
    if !(first.is_ascii_alphabetic() || matches!(first, b'/' | b'!' | b'?')) {
        return None;
    }
    for (offset, &byte) in bytes[start + 1..].iter().enumerate() {
        match byte {
            b'>' => return Some(start + 1 + offset + 1),
            b'<' | b'{' | b'}' | b'[' | b']' => return None,
            _ => {}
        }
    }
    None
}

/// Fence selection then tag removal, repeated until nothing changes
///
/// Every changing pass strictly shortens the text, so this terminates and
/// is idempotent.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    fixed_point(text, |current| strip_tags(select_fence(current).unwrap_or(current)))
}

/// Tag removal alone, repeated until nothing changes
///
/// Used when the selected fence turns out not to hold the payload.
#[must_use]
pub fn strip_markup_unfenced(text: &str) -> String {
    fixed_point(text, strip_tags)
}

fn fixed_point(text: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = text.to_string();
    loop {
        let next = pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}
